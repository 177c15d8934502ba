//! Wire encoder
//!
//! Flattens a consumed batch into the compact integer representation:
//! every mutation row starts with its opcode, string literals appear as
//! table indices, and absent optional fields are the reserved word `0`
//! (present string-valued fields shift by one to stay distinguishable).

use crate::batch::{CallArg, ChangeRecord, NodeDescriptor, ObjectCall, PendingBatch};
use crate::message::Envelope;
use crate::strings::value_or_zero;
use crate::{handle_or_zero, Handle};

/// Argument tag words. Each argument is `[tag, payload...]`.
pub const ARG_INT: u32 = 1;
pub const ARG_FLOAT: u32 = 2;
pub const ARG_BOOL: u32 = 3;
pub const ARG_STR: u32 = 4;
pub const ARG_REF: u32 = 5;
pub const ARG_FLOAT_LIST: u32 = 6;

/// Consume a batch and the string delta of the same turn into one envelope.
pub fn encode(batch: PendingBatch, strings: Vec<String>) -> Envelope {
    let mut nodes = Vec::with_capacity(batch.descriptors.len() * 5);
    for descriptor in &batch.descriptors {
        push_descriptor(&mut nodes, descriptor);
    }

    let mut mutations = Vec::new();
    for record in &batch.records {
        push_record(&mut mutations, record);
    }

    let events = batch
        .new_event_types
        .iter()
        .map(|id| id.index())
        .collect();

    Envelope { strings, nodes, mutations, events }
}

fn push_descriptor(out: &mut Vec<u32>, descriptor: &NodeDescriptor) {
    out.push(descriptor.handle.as_u32());
    out.push(descriptor.node_type.as_u32());
    out.push(descriptor.name.index());
    out.push(value_or_zero(descriptor.text));
    out.push(descriptor.namespace.map_or(0, |id| id.index()));
}

fn push_record(out: &mut Vec<u32>, record: &ChangeRecord) {
    match record {
        ChangeRecord::Attributes { target, name, namespace, value } => {
            out.push(crate::Opcode::Attributes.as_u32());
            out.push(target.as_u32());
            out.push(name.index());
            out.push(namespace.index());
            out.push(value_or_zero(*value));
        }
        ChangeRecord::CharacterData { target, value } => {
            out.push(crate::Opcode::CharacterData.as_u32());
            out.push(target.as_u32());
            out.push(value.index());
        }
        ChangeRecord::ChildList { parent, removed, added, anchor, anchor_prev } => {
            out.push(crate::Opcode::ChildList.as_u32());
            out.push(parent.as_u32());
            out.push(handle_or_zero(*anchor));
            out.push(handle_or_zero(*anchor_prev));
            out.push(added.len() as u32);
            out.push(removed.len() as u32);
            out.extend(added.iter().copied().map(Handle::as_u32));
            out.extend(removed.iter().copied().map(Handle::as_u32));
        }
        ChangeRecord::Properties { target, name, value } => {
            out.push(crate::Opcode::Properties.as_u32());
            out.push(target.as_u32());
            out.push(name.index());
            match value {
                crate::PropertyPayload::Text(id) => {
                    out.push(0);
                    out.push(id.value_field());
                }
                crate::PropertyPayload::Flag(flag) => {
                    out.push(1);
                    out.push(u32::from(*flag));
                }
            }
        }
        ChangeRecord::EventSubscription { target, remaining, event_type, flags } => {
            out.push(crate::Opcode::EventSubscription.as_u32());
            out.push(target.as_u32());
            out.push(*remaining);
            out.push(event_type.index());
            out.push(flags.bits());
        }
        ChangeRecord::ObjectCall(call) => {
            out.push(crate::Opcode::ObjectCall.as_u32());
            push_call(out, call, None);
        }
        ChangeRecord::ObjectCreate { call, result } => {
            out.push(crate::Opcode::ObjectCreate.as_u32());
            push_call(out, call, Some(*result));
        }
        ChangeRecord::ObjectMutation { target, name, value } => {
            out.push(crate::Opcode::ObjectMutation.as_u32());
            out.push(name.index());
            out.push(target.kind_word());
            out.push(target.handle().as_u32());
            push_arg(out, value);
        }
        ChangeRecord::RenderContextRequest { canvas, context, kind } => {
            out.push(crate::Opcode::RenderContextRequest.as_u32());
            out.push(canvas.as_u32());
            out.push(context.as_u32());
            out.push(kind.index());
        }
        ChangeRecord::ImageHandleRequest { source, image } => {
            out.push(crate::Opcode::ImageHandleRequest.as_u32());
            out.push(source.as_u32());
            out.push(image.as_u32());
        }
    }
}

fn push_call(out: &mut Vec<u32>, call: &ObjectCall, result: Option<Handle>) {
    out.push(call.fn_name.index());
    out.push(call.target.kind_word());
    out.push(call.target.handle().as_u32());
    if let Some(result) = result {
        out.push(result.as_u32());
    }
    out.push(call.args.len() as u32);
    for arg in &call.args {
        push_arg(out, arg);
    }
}

fn push_arg(out: &mut Vec<u32>, arg: &CallArg) {
    match arg {
        CallArg::Int(value) => {
            out.push(ARG_INT);
            out.push(*value as u32);
        }
        CallArg::Float(value) => {
            out.push(ARG_FLOAT);
            out.push((*value as f32).to_bits());
        }
        CallArg::Bool(value) => {
            out.push(ARG_BOOL);
            out.push(u32::from(*value));
        }
        CallArg::Str(id) => {
            out.push(ARG_STR);
            out.push(id.index());
        }
        CallArg::Ref(target) => {
            out.push(ARG_REF);
            out.push(target.kind_word());
            out.push(target.handle().as_u32());
        }
        CallArg::FloatList(values) => {
            out.push(ARG_FLOAT_LIST);
            out.push(values.len() as u32);
            out.extend(values.iter().map(|value| (*value as f32).to_bits()));
        }
    }
}
