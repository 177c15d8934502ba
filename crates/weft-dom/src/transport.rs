//! Channel seam
//!
//! The document posts outbound envelopes through `Transport` and consumes
//! host replies through `Document::receive`. Concrete links live outside
//! this crate; a closure works as a sink for harness use.

use weft_wire::{Envelope, Handle};

use crate::broker::ReferenceTarget;
use crate::events::DomEvent;

/// Outbound half of the channel.
pub trait Transport {
    /// Post one encoded envelope toward the host context.
    fn post(&mut self, envelope: Envelope);
}

impl<F: FnMut(Envelope)> Transport for F {
    fn post(&mut self, envelope: Envelope) {
        self(envelope)
    }
}

/// Replies and events arriving from the host context, demultiplexed by
/// handle. The channel is trusted: no structural validation happens here.
pub enum InboundMessage {
    /// A requested reference materialized; its queued calls replay now.
    ReferenceResolved {
        handle: Handle,
        target: Box<dyn ReferenceTarget>,
    },
    /// The host could not materialize the reference.
    ReferenceFailed { handle: Handle, reason: String },
    /// An event fired against a mirrored node.
    Event(DomEvent),
}

impl std::fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReferenceResolved { handle, .. } => f
                .debug_struct("ReferenceResolved")
                .field("handle", handle)
                .finish_non_exhaustive(),
            Self::ReferenceFailed { handle, reason } => f
                .debug_struct("ReferenceFailed")
                .field("handle", handle)
                .field("reason", reason)
                .finish(),
            Self::Event(event) => f.debug_tuple("Event").field(event).finish(),
        }
    }
}
