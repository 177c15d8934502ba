//! In-process loopback link
//!
//! Both halves of the channel inside one thread, for harnesses and tests:
//! posted envelopes pile up for inspection, and replies injected on the
//! inbound side reach the document on the next pump. Clones share the same
//! buffers, so one clone can ride inside the document as its transport
//! while the harness keeps another for reading.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use weft_dom::{Document, InboundMessage, Transport};
use weft_wire::Envelope;

/// Same-thread link with both directions buffered.
#[derive(Clone, Default)]
pub struct MemoryLink {
    outbound: Rc<RefCell<VecDeque<Envelope>>>,
    inbound: Rc<RefCell<VecDeque<InboundMessage>>>,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport handle for `Document::set_transport`.
    pub fn transport(&self) -> Box<dyn Transport> {
        Box::new(self.clone())
    }

    /// Envelopes posted since the last drain, oldest first.
    pub fn drain_outbound(&self) -> Vec<Envelope> {
        self.outbound.borrow_mut().drain(..).collect()
    }

    pub fn outbound_len(&self) -> usize {
        self.outbound.borrow().len()
    }

    /// Queue a reply for the next `pump`.
    pub fn inject(&self, message: InboundMessage) {
        self.inbound.borrow_mut().push_back(message);
    }

    /// Deliver every queued inbound message to the document, in injection
    /// order. Returns how many were delivered. Messages injected by a
    /// handler during delivery wait for the next pump.
    pub fn pump(&self, document: &mut Document) -> usize {
        let queued: Vec<InboundMessage> = self.inbound.borrow_mut().drain(..).collect();
        let delivered = queued.len();
        for message in queued {
            document.receive(message);
        }
        delivered
    }
}

impl Transport for MemoryLink {
    fn post(&mut self, envelope: Envelope) {
        tracing::trace!(
            mutation_words = envelope.mutations.len(),
            "loopback captured envelope"
        );
        self.outbound.borrow_mut().push_back(envelope);
    }
}
