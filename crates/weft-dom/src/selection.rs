//! Selection proxy
//!
//! Stand-in for the host's selection singleton. Mirrors anchor and focus
//! bookkeeping locally; hit testing and visual selection are host concerns.

use weft_wire::{CallTarget, Handle, ObjectOp, StringTable};

use crate::broker::{int_arg, node_arg, CallValue, ReferenceKind, ReferenceTarget};
use crate::document::Document;
use crate::range::RangeBoundary;
use crate::registry::DOCUMENT_HANDLE;

/// Local emulation of the selection object.
#[derive(Debug, Default)]
pub struct SelectionTarget {
    anchor: Option<RangeBoundary>,
    focus: Option<RangeBoundary>,
}

impl SelectionTarget {
    pub fn anchor(&self) -> Option<RangeBoundary> {
        self.anchor
    }

    pub fn focus(&self) -> Option<RangeBoundary> {
        self.focus
    }

    /// An empty selection counts as collapsed.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

impl ReferenceTarget for SelectionTarget {
    fn apply(&mut self, op: &ObjectOp, strings: &StringTable) {
        let ObjectOp::Call(call) = op else { return };
        match strings.resolve(call.fn_name) {
            "collapse" => {
                if let Some(node) = node_arg(&call.args, 0) {
                    let offset = int_arg(&call.args, 1).unwrap_or(0) as u32;
                    self.anchor = Some(RangeBoundary::At(node, offset));
                    self.focus = self.anchor;
                }
            }
            "selectAllChildren" => {
                if let Some(node) = node_arg(&call.args, 0) {
                    self.anchor = Some(RangeBoundary::At(node, 0));
                    self.focus = Some(RangeBoundary::ContentsEnd(node));
                }
            }
            "removeAllRanges" => {
                self.anchor = None;
                self.focus = None;
            }
            // The range argument is an opaque handle here; only the host can
            // read its boundaries back into the selection.
            "addRange" => {}
            other => tracing::trace!(fn_name = other, "unrecognized selection operation"),
        }
    }
}

impl Document {
    /// Handle of the selection proxy, requested from the host on first use.
    pub fn selection(&mut self) -> Handle {
        if let Some(handle) = self.selection_handle {
            return handle;
        }
        let handle = self.request_reference(
            CallTarget::Node(DOCUMENT_HANDLE),
            "getSelection",
            Vec::new(),
            ReferenceKind::Selection,
            Some(Box::new(SelectionTarget::default())),
        );
        self.selection_handle = Some(handle);
        handle
    }

    pub fn selection_collapse(&mut self, node: Handle, offset: u32) {
        let selection = self.selection();
        self.call_reference(
            selection,
            "collapse",
            vec![CallValue::Node(node), CallValue::Int(offset as i32)],
        );
    }

    pub fn selection_select_all_children(&mut self, node: Handle) {
        let selection = self.selection();
        self.call_reference(selection, "selectAllChildren", vec![CallValue::Node(node)]);
    }

    pub fn selection_add_range(&mut self, range: Handle) {
        let selection = self.selection();
        self.call_reference(selection, "addRange", vec![CallValue::Reference(range)]);
    }

    pub fn selection_remove_all_ranges(&mut self) {
        let selection = self.selection();
        self.call_reference(selection, "removeAllRanges", Vec::new());
    }
}
