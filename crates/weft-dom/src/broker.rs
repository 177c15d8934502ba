//! Reference broker
//!
//! Stand-ins for objects that only the host context can materialize:
//! rendering contexts, gradients, patterns, ranges, selections, the history
//! and location singletons. The requesting call allocates a handle
//! immediately and never blocks; operations issued before the host's reply
//! queue in order and replay exactly once on resolution.

use std::any::Any;
use std::collections::HashMap;

use weft_wire::{CallArg, CallTarget, Handle, ObjectOp, StringTable};

/// Host-materialized counterpart of a reference stand-in, or the local
/// emulation shadowing it. `Any` gives typed access by downcast; `Send`
/// lets resolutions cross a thread-backed link.
pub trait ReferenceTarget: Any + Send {
    /// Apply one operation (a queued replay or a live call).
    fn apply(&mut self, op: &ObjectOp, strings: &StringTable);
}

/// What a reference stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    RenderContext,
    Gradient,
    Pattern,
    ImageBitmap,
    Range,
    Selection,
    History,
    Location,
}

/// API-level call argument; lowered into wire form at record time.
#[derive(Debug, Clone, PartialEq)]
pub enum CallValue {
    Int(i32),
    Float(f64),
    Bool(bool),
    Str(String),
    Node(Handle),
    Reference(Handle),
    FloatList(Vec<f64>),
}

pub(crate) fn lower_arg(strings: &mut StringTable, value: CallValue) -> CallArg {
    match value {
        CallValue::Int(value) => CallArg::Int(value),
        CallValue::Float(value) => CallArg::Float(value),
        CallValue::Bool(value) => CallArg::Bool(value),
        CallValue::Str(value) => CallArg::Str(strings.intern(&value)),
        CallValue::Node(handle) => CallArg::Ref(CallTarget::Node(handle)),
        CallValue::Reference(handle) => CallArg::Ref(CallTarget::Reference(handle)),
        CallValue::FloatList(values) => CallArg::FloatList(values),
    }
}

pub(crate) fn lower_args(strings: &mut StringTable, args: Vec<CallValue>) -> Vec<CallArg> {
    args.into_iter().map(|value| lower_arg(strings, value)).collect()
}

// Positional readers for emulations decoding replayed operations.

pub(crate) fn str_arg<'a>(args: &[CallArg], index: usize, strings: &'a StringTable) -> Option<&'a str> {
    match args.get(index)? {
        CallArg::Str(id) => Some(strings.resolve(*id)),
        _ => None,
    }
}

pub(crate) fn int_arg(args: &[CallArg], index: usize) -> Option<i32> {
    match args.get(index)? {
        CallArg::Int(value) => Some(*value),
        _ => None,
    }
}

pub(crate) fn float_arg(args: &[CallArg], index: usize) -> Option<f64> {
    match args.get(index)? {
        CallArg::Float(value) => Some(*value),
        CallArg::Int(value) => Some(f64::from(*value)),
        _ => None,
    }
}

pub(crate) fn bool_arg(args: &[CallArg], index: usize) -> Option<bool> {
    match args.get(index)? {
        CallArg::Bool(value) => Some(*value),
        _ => None,
    }
}

pub(crate) fn node_arg(args: &[CallArg], index: usize) -> Option<Handle> {
    match args.get(index)? {
        CallArg::Ref(CallTarget::Node(handle)) => Some(*handle),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceState {
    Pending,
    Resolved,
    Failed,
}

struct ReferenceEntry {
    kind: ReferenceKind,
    state: ReferenceState,
    /// Operations awaiting resolution, in call order. Never dropped while
    /// pending; drained exactly once.
    pending: Vec<ObjectOp>,
    /// Local shadow, fed every operation whether pending or resolved.
    emulation: Option<Box<dyn ReferenceTarget>>,
    resolved: Option<Box<dyn ReferenceTarget>>,
}

/// Table of live reference stand-ins, keyed by handle.
#[derive(Default)]
pub struct ReferenceBroker {
    entries: HashMap<Handle, ReferenceEntry>,
}

impl ReferenceBroker {
    pub(crate) fn register(
        &mut self,
        handle: Handle,
        kind: ReferenceKind,
        emulation: Option<Box<dyn ReferenceTarget>>,
    ) {
        self.entries.insert(
            handle,
            ReferenceEntry {
                kind,
                state: ReferenceState::Pending,
                pending: Vec::new(),
                emulation,
                resolved: None,
            },
        );
    }

    pub fn kind(&self, handle: Handle) -> Option<ReferenceKind> {
        self.entries.get(&handle).map(|entry| entry.kind)
    }

    pub fn is_pending(&self, handle: Handle) -> bool {
        self.entries
            .get(&handle)
            .is_some_and(|entry| entry.state == ReferenceState::Pending)
    }

    pub fn is_resolved(&self, handle: Handle) -> bool {
        self.entries
            .get(&handle)
            .is_some_and(|entry| entry.state == ReferenceState::Resolved)
    }

    pub fn is_failed(&self, handle: Handle) -> bool {
        self.entries
            .get(&handle)
            .is_some_and(|entry| entry.state == ReferenceState::Failed)
    }

    /// Queued operations awaiting resolution.
    pub fn pending_len(&self, handle: Handle) -> usize {
        self.entries.get(&handle).map_or(0, |entry| entry.pending.len())
    }

    /// Route one operation: the emulation sees it immediately, a pending
    /// entry queues it, a resolved entry applies it to the live target, a
    /// failed entry drops it.
    pub(crate) fn record_op(&mut self, handle: Handle, op: ObjectOp, strings: &StringTable) {
        let Some(entry) = self.entries.get_mut(&handle) else {
            tracing::trace!(handle = handle.as_u32(), "operation on unknown reference ignored");
            return;
        };
        if let Some(emulation) = entry.emulation.as_mut() {
            emulation.apply(&op, strings);
        }
        match entry.state {
            ReferenceState::Pending => entry.pending.push(op),
            ReferenceState::Resolved => {
                if let Some(target) = entry.resolved.as_mut() {
                    target.apply(&op, strings);
                }
            }
            ReferenceState::Failed => {}
        }
    }

    /// Host reply: the reference materialized. Replays the queue in call
    /// order exactly once, then discards it permanently. Unknown handles
    /// and non-pending entries are inert.
    pub(crate) fn resolve(
        &mut self,
        handle: Handle,
        mut target: Box<dyn ReferenceTarget>,
        strings: &StringTable,
    ) {
        let Some(entry) = self.entries.get_mut(&handle) else {
            tracing::trace!(handle = handle.as_u32(), "resolution for unknown reference ignored");
            return;
        };
        if entry.state != ReferenceState::Pending {
            tracing::trace!(handle = handle.as_u32(), state = ?entry.state, "late resolution ignored");
            return;
        }
        let replayed = entry.pending.len();
        for op in entry.pending.drain(..) {
            target.apply(&op, strings);
        }
        entry.resolved = Some(target);
        entry.state = ReferenceState::Resolved;
        tracing::debug!(
            handle = handle.as_u32(),
            kind = ?entry.kind,
            replayed,
            "reference resolved"
        );
    }

    /// Host reply: the reference could not materialize. Queued operations
    /// are dropped, not retried.
    pub(crate) fn fail(&mut self, handle: Handle, reason: &str) {
        let Some(entry) = self.entries.get_mut(&handle) else {
            tracing::trace!(handle = handle.as_u32(), "failure for unknown reference ignored");
            return;
        };
        if entry.state != ReferenceState::Pending {
            tracing::trace!(handle = handle.as_u32(), state = ?entry.state, "late failure ignored");
            return;
        }
        let dropped = entry.pending.len();
        entry.pending.clear();
        entry.state = ReferenceState::Failed;
        tracing::debug!(handle = handle.as_u32(), dropped, reason, "reference failed");
    }

    /// Typed view of an entry's local emulation.
    pub fn emulation<T: ReferenceTarget>(&self, handle: Handle) -> Option<&T> {
        let entry = self.entries.get(&handle)?;
        let target: &dyn Any = entry.emulation.as_deref()?;
        target.downcast_ref::<T>()
    }

    /// Typed view of an entry's resolved target.
    pub fn resolved<T: ReferenceTarget>(&self, handle: Handle) -> Option<&T> {
        let entry = self.entries.get(&handle)?;
        let target: &dyn Any = entry.resolved.as_deref()?;
        target.downcast_ref::<T>()
    }
}
