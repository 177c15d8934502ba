//! Weft DOM - worker-side mirrored document
//!
//! The tree a worker mutates locally, the batch machinery that forwards
//! those mutations to the host once per turn, and the proxy layer for
//! host-materialized objects.

mod arena;
mod broker;
mod capability;
mod document;
mod error;
mod events;
mod history;
mod location;
mod mutation;
mod node;
mod observer;
mod range;
mod registry;
mod schedule;
mod selection;
mod transport;

pub use broker::{CallValue, ReferenceBroker, ReferenceKind, ReferenceTarget};
pub use capability::ElementCapabilities;
pub use document::{Document, DocumentInit};
pub use error::{DomError, DomResult};
pub use events::{DomEvent, ListenerId};
pub use history::{HistoryEntry, HistoryTarget};
pub use location::LocationTarget;
pub use node::{Attribute, ElementData, Node, NodeData, Property, PropertyValue, TextData};
pub use observer::{ObservedRecord, ObserverOptions};
pub use range::{RangeBoundary, RangeTarget};
pub use registry::{BODY_HANDLE, DOCUMENT_HANDLE, HEAD_HANDLE, HTML_HANDLE};
pub use schedule::ObserverId;
pub use selection::SelectionTarget;
pub use transport::{InboundMessage, Transport};

// Wire types that appear throughout the document API.
pub use weft_wire::{CallTarget, Envelope, Handle, ListenerFlags, Opcode, HTML_NAMESPACE};
