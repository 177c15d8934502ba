//! Channel envelope
//!
//! The single message shape that crosses the worker/host boundary in the
//! worker-to-host direction. All four segments are position-encoded; an
//! empty envelope is never sent (the flush skips it).

use serde::{Deserialize, Serialize};

/// One flushed turn of mutations.
///
/// `strings` carries only the table suffix interned since the previous
/// envelope; receivers append it to their own copy before resolving any
/// index in the other segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// String-table delta, in interning order.
    pub strings: Vec<String>,
    /// Creation descriptors, five words per node.
    pub nodes: Vec<u32>,
    /// Change records, opcode-prefixed, variable length.
    pub mutations: Vec<u32>,
    /// Event types first subscribed during this turn, as string indices.
    pub events: Vec<u32>,
}

impl Envelope {
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
            && self.nodes.is_empty()
            && self.mutations.is_empty()
            && self.events.is_empty()
    }
}
