//! Weft wire format
//!
//! The compact integer encoding carried over the worker-to-host mutation
//! channel: the append-only string table, the pending batch of change
//! records, and the encoder that turns one closed batch into an outbound
//! envelope. This crate knows nothing about the mirrored tree itself.

mod batch;
mod encode;
mod message;
mod strings;
mod types;

pub use batch::{CallArg, ChangeRecord, NodeDescriptor, ObjectCall, ObjectOp, PendingBatch, PropertyPayload};
pub use encode::{encode, ARG_BOOL, ARG_FLOAT, ARG_FLOAT_LIST, ARG_INT, ARG_REF, ARG_STR};
pub use message::Envelope;
pub use strings::{StringId, StringTable};
pub use types::{CallTarget, ListenerFlags, NodeType, Opcode};

/// Default namespace for elements created without an explicit one.
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Stable integer identity for a mirrored node or host-only reference object.
///
/// Handles are assigned at creation from a single document-wide counter and
/// never reused. `0` never names an object: the wire reserves it for
/// "absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    /// Wrap a raw wire value.
    pub const fn from_raw(raw: u32) -> Self {
        Handle(raw)
    }

    /// The raw wire value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Wire value for an optional handle slot (`0` = absent).
pub fn handle_or_zero(handle: Option<Handle>) -> u32 {
    handle.map(Handle::as_u32).unwrap_or(0)
}
