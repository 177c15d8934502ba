//! Range proxy
//!
//! Stand-in for a host range object. Boundary bookkeeping lives in the
//! emulation; anything that needs real layout or text offsets happens
//! host-side after the operations replay.

use weft_wire::{CallTarget, Handle, ObjectOp, StringTable};

use crate::broker::{bool_arg, int_arg, node_arg, CallValue, ReferenceKind, ReferenceTarget};
use crate::document::Document;
use crate::registry::DOCUMENT_HANDLE;

/// One end of a range or selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBoundary {
    /// Explicit node and offset.
    At(Handle, u32),
    /// The end of a node's contents; only the host knows the offset.
    ContentsEnd(Handle),
}

/// Local emulation of a host range.
#[derive(Debug, Default)]
pub struct RangeTarget {
    start: Option<RangeBoundary>,
    end: Option<RangeBoundary>,
}

impl RangeTarget {
    pub fn start(&self) -> Option<RangeBoundary> {
        self.start
    }

    pub fn end(&self) -> Option<RangeBoundary> {
        self.end
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

impl ReferenceTarget for RangeTarget {
    fn apply(&mut self, op: &ObjectOp, strings: &StringTable) {
        let ObjectOp::Call(call) = op else { return };
        match strings.resolve(call.fn_name) {
            "setStart" => {
                if let (Some(node), Some(offset)) = (node_arg(&call.args, 0), int_arg(&call.args, 1)) {
                    self.start = Some(RangeBoundary::At(node, offset as u32));
                    if self.end.is_none() {
                        self.end = self.start;
                    }
                }
            }
            "setEnd" => {
                if let (Some(node), Some(offset)) = (node_arg(&call.args, 0), int_arg(&call.args, 1)) {
                    self.end = Some(RangeBoundary::At(node, offset as u32));
                    if self.start.is_none() {
                        self.start = self.end;
                    }
                }
            }
            "selectNodeContents" => {
                if let Some(node) = node_arg(&call.args, 0) {
                    self.start = Some(RangeBoundary::At(node, 0));
                    self.end = Some(RangeBoundary::ContentsEnd(node));
                }
            }
            "collapse" => {
                if bool_arg(&call.args, 0).unwrap_or(false) {
                    self.end = self.start;
                } else {
                    self.start = self.end;
                }
            }
            "deleteContents" => {
                // Contents vanish host-side; the range is left collapsed at its start.
                self.end = self.start;
            }
            // detach is inert in the mirrored model, same as in current browsers.
            "detach" => {}
            other => tracing::trace!(fn_name = other, "unrecognized range operation"),
        }
    }
}

impl Document {
    /// Request a fresh range proxy. Each call creates a new one.
    pub fn create_range(&mut self) -> Handle {
        self.request_reference(
            CallTarget::Node(DOCUMENT_HANDLE),
            "createRange",
            Vec::new(),
            ReferenceKind::Range,
            Some(Box::new(RangeTarget::default())),
        )
    }

    pub fn range_set_start(&mut self, range: Handle, node: Handle, offset: u32) {
        self.call_reference(
            range,
            "setStart",
            vec![CallValue::Node(node), CallValue::Int(offset as i32)],
        );
    }

    pub fn range_set_end(&mut self, range: Handle, node: Handle, offset: u32) {
        self.call_reference(
            range,
            "setEnd",
            vec![CallValue::Node(node), CallValue::Int(offset as i32)],
        );
    }

    pub fn range_select_node_contents(&mut self, range: Handle, node: Handle) {
        self.call_reference(range, "selectNodeContents", vec![CallValue::Node(node)]);
    }

    pub fn range_collapse(&mut self, range: Handle, to_start: bool) {
        self.call_reference(range, "collapse", vec![CallValue::Bool(to_start)]);
    }

    pub fn range_delete_contents(&mut self, range: Handle) {
        self.call_reference(range, "deleteContents", Vec::new());
    }

    pub fn range_detach(&mut self, range: Handle) {
        self.call_reference(range, "detach", Vec::new());
    }
}
