//! Host-side test double
//!
//! Consumes envelopes the way a real host would: appends each string delta
//! to its own table copy, walks the mutation stream, and notes every row
//! that asks for something only the host can materialize. Replies are
//! built separately from request bookkeeping, so a harness can answer in
//! arrival order or pluck requests out of order to exercise queued replay.

use std::collections::VecDeque;

use weft_dom::{InboundMessage, ReferenceTarget};
use weft_wire::{Envelope, Handle, ObjectOp, Opcode, StringTable, ARG_FLOAT_LIST, ARG_REF};

/// One request noted while scanning a mutation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeRequest {
    /// A canvas asked for a rendering context.
    RenderContext {
        canvas: Handle,
        context: Handle,
        kind: String,
    },
    /// A node's contents asked to be decoded into an image.
    Image { source: Handle, image: Handle },
    /// An object-create row named a result handle: gradients, patterns,
    /// ranges, the history/location/selection singletons.
    Object { fn_name: String, result: Handle },
}

impl UpgradeRequest {
    /// The handle the reply must carry.
    pub fn handle(&self) -> Handle {
        match self {
            Self::RenderContext { context, .. } => *context,
            Self::Image { image, .. } => *image,
            Self::Object { result, .. } => *result,
        }
    }
}

/// Reference counterpart that records what replays into it, for asserting
/// replay order and content.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    ops: Vec<String>,
}

impl RecordingTarget {
    /// Applied operations: function names for calls, `set:name` for
    /// property writes, in application order.
    pub fn ops(&self) -> &[String] {
        &self.ops
    }
}

impl ReferenceTarget for RecordingTarget {
    fn apply(&mut self, op: &ObjectOp, strings: &StringTable) {
        match op {
            ObjectOp::Call(call) => {
                self.ops.push(strings.resolve(call.fn_name).to_string());
            }
            ObjectOp::Set { name, .. } => {
                self.ops.push(format!("set:{}", strings.resolve(*name)));
            }
        }
    }
}

/// Host stand-in tracking the cumulative string table and the unanswered
/// upgrade requests, in arrival order.
#[derive(Default)]
pub struct HostStub {
    strings: Vec<String>,
    requests: VecDeque<UpgradeRequest>,
    envelopes_seen: usize,
    nodes_seen: usize,
}

impl HostStub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one envelope: append the string delta, count descriptors,
    /// and queue any upgrade requests found in the mutation stream.
    pub fn absorb(&mut self, envelope: &Envelope) {
        self.strings.extend(envelope.strings.iter().cloned());
        self.envelopes_seen += 1;
        self.nodes_seen += envelope.nodes.len() / 5;

        let words = &envelope.mutations;
        let mut cursor = 0;
        while cursor < words.len() {
            let Some(next) = self.scan_row(words, cursor) else {
                tracing::warn!(cursor, "truncated mutation row, rest of stream skipped");
                break;
            };
            cursor = next;
        }
        tracing::debug!(
            envelopes = self.envelopes_seen,
            pending = self.requests.len(),
            "envelope absorbed"
        );
    }

    /// Unanswered requests, oldest first.
    pub fn requests(&self) -> impl Iterator<Item = &UpgradeRequest> {
        self.requests.iter()
    }

    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    pub fn envelopes_seen(&self) -> usize {
        self.envelopes_seen
    }

    /// Creation descriptors seen so far across all envelopes.
    pub fn nodes_seen(&self) -> usize {
        self.nodes_seen
    }

    /// Pop the oldest unanswered request.
    pub fn take_request(&mut self) -> Option<UpgradeRequest> {
        self.requests.pop_front()
    }

    /// Pop a specific unanswered request, for answering out of arrival
    /// order.
    pub fn take_request_for(&mut self, handle: Handle) -> Option<UpgradeRequest> {
        let index = self
            .requests
            .iter()
            .position(|request| request.handle() == handle)?;
        self.requests.remove(index)
    }

    /// Successful reply carrying `target` as the materialized counterpart.
    pub fn resolution(
        request: &UpgradeRequest,
        target: Box<dyn ReferenceTarget>,
    ) -> InboundMessage {
        InboundMessage::ReferenceResolved { handle: request.handle(), target }
    }

    /// Failure reply.
    pub fn refusal(request: &UpgradeRequest, reason: &str) -> InboundMessage {
        InboundMessage::ReferenceFailed {
            handle: request.handle(),
            reason: reason.to_string(),
        }
    }

    /// Answer everything outstanding in arrival order, resolving each
    /// request with a fresh [`RecordingTarget`].
    pub fn resolve_all(&mut self) -> Vec<InboundMessage> {
        let mut replies = Vec::with_capacity(self.requests.len());
        while let Some(request) = self.requests.pop_front() {
            replies.push(Self::resolution(&request, Box::new(RecordingTarget::default())));
        }
        replies
    }

    fn lookup(&self, index: u32) -> String {
        self.strings.get(index as usize).cloned().unwrap_or_default()
    }

    /// Note any request in the row starting at `at`; returns the start of
    /// the next row, or `None` if the stream ends mid-row.
    fn scan_row(&mut self, words: &[u32], at: usize) -> Option<usize> {
        let opcode = Opcode::from_u32(*words.get(at)?)?;
        match opcode {
            Opcode::Attributes => bounded(words, at + 5),
            Opcode::CharacterData => bounded(words, at + 3),
            Opcode::ChildList => {
                let added = *words.get(at + 4)? as usize;
                let removed = *words.get(at + 5)? as usize;
                bounded(words, at + 6 + added + removed)
            }
            Opcode::Properties => bounded(words, at + 5),
            Opcode::EventSubscription => bounded(words, at + 5),
            Opcode::ObjectCall => {
                let argc = *words.get(at + 4)? as usize;
                skip_args(words, at + 5, argc)
            }
            Opcode::ObjectCreate => {
                let fn_name = self.lookup(*words.get(at + 1)?);
                let result = Handle::from_raw(*words.get(at + 4)?);
                let argc = *words.get(at + 5)? as usize;
                let next = skip_args(words, at + 6, argc)?;
                self.requests.push_back(UpgradeRequest::Object { fn_name, result });
                Some(next)
            }
            Opcode::ObjectMutation => skip_args(words, at + 4, 1),
            Opcode::RenderContextRequest => {
                let canvas = Handle::from_raw(*words.get(at + 1)?);
                let context = Handle::from_raw(*words.get(at + 2)?);
                let kind = self.lookup(*words.get(at + 3)?);
                self.requests
                    .push_back(UpgradeRequest::RenderContext { canvas, context, kind });
                Some(at + 4)
            }
            Opcode::ImageHandleRequest => {
                let source = Handle::from_raw(*words.get(at + 1)?);
                let image = Handle::from_raw(*words.get(at + 2)?);
                self.requests.push_back(UpgradeRequest::Image { source, image });
                Some(at + 3)
            }
        }
    }
}

/// Advance past `count` serialized call arguments starting at `at`.
fn skip_args(words: &[u32], mut at: usize, count: usize) -> Option<usize> {
    for _ in 0..count {
        let tag = *words.get(at)?;
        at += match tag {
            ARG_REF => 3,
            ARG_FLOAT_LIST => 2 + *words.get(at + 1)? as usize,
            _ => 2,
        };
    }
    bounded(words, at)
}

/// The row end is valid when it does not run past the stream.
fn bounded(words: &[u32], end: usize) -> Option<usize> {
    (end <= words.len()).then_some(end)
}
