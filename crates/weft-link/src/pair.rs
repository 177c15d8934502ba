//! Two-thread link
//!
//! An mpsc-backed channel pair for embeddings that run the document on a
//! worker thread and the host loop elsewhere. Both message types cross
//! threads whole: envelopes are plain data and resolution targets are
//! `Send` by trait bound. Disconnection is quiet; whichever side outlives
//! the other logs and drops.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use weft_dom::{Document, InboundMessage, Transport};
use weft_wire::Envelope;

/// Worker-side half: posts envelopes, receives replies.
pub struct WorkerLink {
    outbound: Sender<Envelope>,
    inbound: Receiver<InboundMessage>,
}

/// Host-side half: receives envelopes, sends replies.
pub struct HostLink {
    inbound: Receiver<Envelope>,
    outbound: Sender<InboundMessage>,
}

/// Build a connected link pair.
pub fn pair() -> (WorkerLink, HostLink) {
    let (post_tx, post_rx) = mpsc::channel();
    let (reply_tx, reply_rx) = mpsc::channel();
    (
        WorkerLink { outbound: post_tx, inbound: reply_rx },
        HostLink { inbound: post_rx, outbound: reply_tx },
    )
}

impl WorkerLink {
    /// A transport handle for `Document::set_transport`.
    pub fn transport(&self) -> Box<dyn Transport> {
        let sender = self.outbound.clone();
        Box::new(move |envelope: Envelope| {
            if sender.send(envelope).is_err() {
                tracing::trace!("host side closed, envelope dropped");
            }
        })
    }

    /// Block until the host replies, or `None` once it hangs up.
    pub fn recv(&self) -> Option<InboundMessage> {
        self.inbound.recv().ok()
    }

    /// Deliver every reply already queued, without blocking. Returns how
    /// many were delivered.
    pub fn pump(&self, document: &mut Document) -> usize {
        let mut delivered = 0;
        loop {
            match self.inbound.try_recv() {
                Ok(message) => {
                    document.receive(message);
                    delivered += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::trace!("host side closed");
                    break;
                }
            }
        }
        delivered
    }
}

impl HostLink {
    /// Block until the worker posts, or `None` once it hangs up.
    pub fn recv(&self) -> Option<Envelope> {
        self.inbound.recv().ok()
    }

    /// Next envelope if one is already queued.
    pub fn try_recv(&self) -> Option<Envelope> {
        self.inbound.try_recv().ok()
    }

    /// Send a reply toward the worker. Lost sends are logged and dropped.
    pub fn send(&self, message: InboundMessage) {
        if self.outbound.send(message).is_err() {
            tracing::trace!("worker side closed, reply dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use weft_dom::{DocumentInit, DomEvent};

    #[test]
    fn test_envelopes_cross_to_the_host_thread() {
        let (worker, host) = pair();

        let posting = thread::spawn(move || {
            let mut document = Document::new(DocumentInit::default());
            document.set_transport(worker.transport());
            let div = document.create_element("div");
            document.append_child(document.body(), div).unwrap();
            document.run_turn();
            div
        });

        let envelope = host.recv().unwrap();
        let div = posting.join().unwrap();
        assert!(envelope.nodes.contains(&div.as_u32()));
    }

    #[test]
    fn test_replies_cross_back_and_pump_delivers() {
        let (worker, host) = pair();
        let mut document = Document::new(DocumentInit::default());
        document.set_transport(worker.transport());
        let target = document.create_element("button");
        document.append_child(document.body(), target).unwrap();

        let replying = thread::spawn(move || {
            host.send(InboundMessage::Event(DomEvent::click(target)));
        });
        replying.join().unwrap();

        assert_eq!(worker.pump(&mut document), 1);
        assert_eq!(worker.pump(&mut document), 0);
    }

    #[test]
    fn test_closed_host_drops_envelopes_quietly() {
        let (worker, host) = pair();
        drop(host);
        let mut document = Document::new(DocumentInit::default());
        document.set_transport(worker.transport());
        let div = document.create_element("div");
        document.append_child(document.body(), div).unwrap();
        document.run_turn();
        assert_eq!(worker.pump(&mut document), 0);
    }
}
