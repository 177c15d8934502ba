//! Pending batch
//!
//! The change records accumulated during one scheduling turn, together with
//! the creation descriptors of nodes first referenced in that turn. A batch
//! is created empty, filled synchronously, consumed exactly once by the
//! encoder, then discarded.

use crate::types::{CallTarget, ListenerFlags, NodeType};
use crate::{Handle, StringId};

/// Creation descriptor for a node crossing the channel for the first time.
///
/// Wire layout: `[handle, node_type, name, text, namespace]` where `text`
/// uses the reserved-zero value convention and `namespace` is `0` for
/// non-element nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub handle: Handle,
    pub node_type: NodeType,
    pub name: StringId,
    pub text: Option<StringId>,
    pub namespace: Option<StringId>,
}

/// One argument of an object-class record.
///
/// Floats cross the wire as f32 bit-patterns in a single word; integers as
/// two's-complement words.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Int(i32),
    Float(f64),
    Bool(bool),
    Str(StringId),
    Ref(CallTarget),
    FloatList(Vec<f64>),
}

/// An invocation against a host counterpart: "call `fn_name(args)` on
/// `target`".
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectCall {
    pub fn_name: StringId,
    pub target: CallTarget,
    pub args: Vec<CallArg>,
}

/// One operation issued against a reference stand-in. This is what the
/// broker queues while a reference is pending and replays on resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectOp {
    Call(ObjectCall),
    Set { name: StringId, value: CallArg },
}

/// Value carried by a Properties record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyPayload {
    Text(StringId),
    Flag(bool),
}

/// One captured change. Literal fields are resolved through the string
/// table at append time, so records carry indices, never owned strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRecord {
    Attributes {
        target: Handle,
        name: StringId,
        namespace: StringId,
        /// `None` = attribute removed.
        value: Option<StringId>,
    },
    CharacterData {
        target: Handle,
        value: StringId,
    },
    ChildList {
        parent: Handle,
        removed: Vec<Handle>,
        added: Vec<Handle>,
        /// Node the added run sits before; `None` = appended at the end.
        anchor: Option<Handle>,
        /// Node preceding the added run, captured at record time so replay
        /// engines can anchor from either end.
        anchor_prev: Option<Handle>,
    },
    Properties {
        target: Handle,
        name: StringId,
        value: PropertyPayload,
    },
    EventSubscription {
        target: Handle,
        /// Locally-registered handlers for the (node, type) pair after this
        /// change.
        remaining: u32,
        event_type: StringId,
        flags: ListenerFlags,
    },
    ObjectCall(ObjectCall),
    ObjectCreate {
        call: ObjectCall,
        /// Handle the host materializes the result under.
        result: Handle,
    },
    ObjectMutation {
        target: CallTarget,
        name: StringId,
        value: CallArg,
    },
    RenderContextRequest {
        canvas: Handle,
        context: Handle,
        kind: StringId,
    },
    ImageHandleRequest {
        source: Handle,
        image: Handle,
    },
}

impl ChangeRecord {
    /// Every node handle this record mentions. A node with an untransmitted
    /// handle here is what triggers descriptor capture.
    pub fn collect_node_handles(&self, out: &mut Vec<Handle>) {
        match self {
            ChangeRecord::Attributes { target, .. }
            | ChangeRecord::CharacterData { target, .. }
            | ChangeRecord::Properties { target, .. }
            | ChangeRecord::EventSubscription { target, .. } => out.push(*target),
            ChangeRecord::ChildList { parent, removed, added, anchor, anchor_prev } => {
                out.push(*parent);
                out.extend(added.iter().copied());
                out.extend(removed.iter().copied());
                out.extend(anchor.iter().copied());
                out.extend(anchor_prev.iter().copied());
            }
            ChangeRecord::ObjectCall(call) | ChangeRecord::ObjectCreate { call, .. } => {
                collect_call_nodes(call, out);
            }
            ChangeRecord::ObjectMutation { target, value, .. } => {
                if let CallTarget::Node(handle) = target {
                    out.push(*handle);
                }
                collect_arg_nodes(value, out);
            }
            ChangeRecord::RenderContextRequest { canvas, .. } => out.push(*canvas),
            ChangeRecord::ImageHandleRequest { source, .. } => out.push(*source),
        }
    }
}

fn collect_call_nodes(call: &ObjectCall, out: &mut Vec<Handle>) {
    if let CallTarget::Node(handle) = call.target {
        out.push(handle);
    }
    for arg in &call.args {
        collect_arg_nodes(arg, out);
    }
}

fn collect_arg_nodes(arg: &CallArg, out: &mut Vec<Handle>) {
    if let CallArg::Ref(CallTarget::Node(handle)) = arg {
        out.push(*handle);
    }
}

/// The mutations of one scheduling turn, waiting for the flush.
#[derive(Debug, Default)]
pub struct PendingBatch {
    pub descriptors: Vec<NodeDescriptor>,
    pub records: Vec<ChangeRecord>,
    /// Event types first subscribed anywhere in the document this turn.
    pub new_event_types: Vec<StringId>,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty() && self.records.is_empty() && self.new_event_types.is_empty()
    }

    /// Same-turn coalescing for character data: a second write to the same
    /// target overwrites the batched value in place. Returns `true` when an
    /// existing record absorbed the write.
    pub fn merge_character_data(&mut self, target: Handle, value: StringId) -> bool {
        for record in self.records.iter_mut().rev() {
            if let ChangeRecord::CharacterData { target: existing, value: slot } = record {
                if *existing == target {
                    *slot = value;
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StringTable;

    #[test]
    fn test_merge_character_data_same_target() {
        let mut strings = StringTable::new();
        let first = strings.intern("one");
        let second = strings.intern("two");
        let target = Handle::from_raw(7);

        let mut batch = PendingBatch::new();
        batch.records.push(ChangeRecord::CharacterData { target, value: first });
        assert!(batch.merge_character_data(target, second));
        assert_eq!(batch.records.len(), 1);
        assert_eq!(
            batch.records[0],
            ChangeRecord::CharacterData { target, value: second }
        );
    }

    #[test]
    fn test_merge_character_data_other_target() {
        let mut strings = StringTable::new();
        let value = strings.intern("text");
        let mut batch = PendingBatch::new();
        batch.records.push(ChangeRecord::CharacterData {
            target: Handle::from_raw(7),
            value,
        });
        assert!(!batch.merge_character_data(Handle::from_raw(8), value));
    }

    #[test]
    fn test_collect_node_handles_child_list() {
        let record = ChangeRecord::ChildList {
            parent: Handle::from_raw(1),
            removed: vec![Handle::from_raw(4)],
            added: vec![Handle::from_raw(2), Handle::from_raw(3)],
            anchor: Some(Handle::from_raw(5)),
            anchor_prev: None,
        };
        let mut handles = Vec::new();
        record.collect_node_handles(&mut handles);
        assert_eq!(
            handles,
            vec![
                Handle::from_raw(1),
                Handle::from_raw(2),
                Handle::from_raw(3),
                Handle::from_raw(4),
                Handle::from_raw(5),
            ]
        );
    }

    #[test]
    fn test_collect_node_handles_skips_reference_targets() {
        let mut strings = StringTable::new();
        let fn_name = strings.intern("addColorStop");
        let record = ChangeRecord::ObjectCall(ObjectCall {
            fn_name,
            target: CallTarget::Reference(Handle::from_raw(30)),
            args: vec![
                CallArg::Ref(CallTarget::Node(Handle::from_raw(6))),
                CallArg::Ref(CallTarget::Reference(Handle::from_raw(31))),
            ],
        });
        let mut handles = Vec::new();
        record.collect_node_handles(&mut handles);
        assert_eq!(handles, vec![Handle::from_raw(6)]);
    }
}
