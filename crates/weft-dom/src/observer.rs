//! Local observer
//!
//! Worker-side mutation observation, independent of the channel: every
//! change applied to the mirrored tree also lands, as an observer-facing
//! record, in the queue of each registered observer. Delivery runs on its
//! own turn task per observer.

use std::collections::BTreeMap;

use weft_wire::{ChangeRecord, Handle, Opcode, StringTable};

use crate::document::Document;
use crate::schedule::ObserverId;

/// Observer-facing view of one change, in the flat mutation-record shape:
/// `target` plus whichever of the remaining fields apply to the record kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedRecord {
    pub kind: Opcode,
    pub target: Handle,
    /// Attribute, property, event-type or function name.
    pub name: Option<String>,
    pub value: Option<String>,
    pub old_value: Option<String>,
    pub added: Vec<Handle>,
    pub removed: Vec<Handle>,
    pub next_sibling: Option<Handle>,
    pub previous_sibling: Option<Handle>,
}

impl ObservedRecord {
    fn base(kind: Opcode, target: Handle) -> Self {
        Self {
            kind,
            target,
            name: None,
            value: None,
            old_value: None,
            added: Vec::new(),
            removed: Vec::new(),
            next_sibling: None,
            previous_sibling: None,
        }
    }

    /// Convert a channel record into its observer-facing form, resolving
    /// interned literals and attaching the previous value where one exists.
    pub(crate) fn from_change(
        record: &ChangeRecord,
        strings: &StringTable,
        old_value: Option<String>,
    ) -> Self {
        let resolve = |id| strings.resolve(id).to_string();
        match record {
            ChangeRecord::Attributes { target, name, namespace: _, value } => {
                let mut observed = Self::base(Opcode::Attributes, *target);
                observed.name = Some(resolve(*name));
                observed.value = value.map(resolve);
                observed.old_value = old_value;
                observed
            }
            ChangeRecord::CharacterData { target, value } => {
                let mut observed = Self::base(Opcode::CharacterData, *target);
                observed.value = Some(resolve(*value));
                observed.old_value = old_value;
                observed
            }
            ChangeRecord::ChildList { parent, removed, added, anchor, anchor_prev } => {
                let mut observed = Self::base(Opcode::ChildList, *parent);
                observed.added = added.clone();
                observed.removed = removed.clone();
                observed.next_sibling = *anchor;
                observed.previous_sibling = *anchor_prev;
                observed
            }
            ChangeRecord::Properties { target, name, value } => {
                let mut observed = Self::base(Opcode::Properties, *target);
                observed.name = Some(resolve(*name));
                observed.value = Some(match value {
                    weft_wire::PropertyPayload::Text(id) => resolve(*id),
                    weft_wire::PropertyPayload::Flag(flag) => flag.to_string(),
                });
                observed
            }
            ChangeRecord::EventSubscription { target, remaining: _, event_type, flags: _ } => {
                let mut observed = Self::base(Opcode::EventSubscription, *target);
                observed.name = Some(resolve(*event_type));
                observed
            }
            ChangeRecord::ObjectCall(call) => {
                let mut observed = Self::base(Opcode::ObjectCall, call.target.handle());
                observed.name = Some(resolve(call.fn_name));
                observed
            }
            ChangeRecord::ObjectCreate { call, result } => {
                let mut observed = Self::base(Opcode::ObjectCreate, call.target.handle());
                observed.name = Some(resolve(call.fn_name));
                observed.added = vec![*result];
                observed
            }
            ChangeRecord::ObjectMutation { target, name, value: _ } => {
                let mut observed = Self::base(Opcode::ObjectMutation, target.handle());
                observed.name = Some(resolve(*name));
                observed
            }
            ChangeRecord::RenderContextRequest { canvas, context, kind } => {
                let mut observed = Self::base(Opcode::RenderContextRequest, *canvas);
                observed.name = Some(resolve(*kind));
                observed.added = vec![*context];
                observed
            }
            ChangeRecord::ImageHandleRequest { source, image } => {
                let mut observed = Self::base(Opcode::ImageHandleRequest, *source);
                observed.added = vec![*image];
                observed
            }
        }
    }
}

pub(crate) type ObserverCallback = Box<dyn FnMut(&mut Document, Vec<ObservedRecord>)>;

/// What a subscription asked to watch. Delivery is document-wide for now;
/// the fields are kept on the entry so callers can read their scope back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverOptions {
    pub subtree: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub child_list: bool,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self { subtree: true, attributes: true, character_data: true, child_list: true }
    }
}

pub(crate) struct ObserverEntry {
    pub target: Handle,
    pub options: ObserverOptions,
    /// Taken out for the duration of a delivery call.
    pub callback: Option<ObserverCallback>,
    pub queue: Vec<ObservedRecord>,
    /// A NotifyObserver task is already on the turn queue.
    pub scheduled: bool,
}

/// Per-document observer dispatcher. Keyed by registration order so
/// scheduling is deterministic.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    entries: BTreeMap<u32, ObserverEntry>,
    next: u32,
}

impl ObserverRegistry {
    pub fn register(
        &mut self,
        target: Handle,
        options: ObserverOptions,
        callback: ObserverCallback,
    ) -> ObserverId {
        let id = ObserverId(self.next);
        self.next += 1;
        self.entries.insert(
            id.0,
            ObserverEntry {
                target,
                options,
                callback: Some(callback),
                queue: Vec::new(),
                scheduled: false,
            },
        );
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> Option<ObserverEntry> {
        self.entries.remove(&id.0)
    }

    pub fn get(&self, id: ObserverId) -> Option<&ObserverEntry> {
        self.entries.get(&id.0)
    }

    pub fn get_mut(&mut self, id: ObserverId) -> Option<&mut ObserverEntry> {
        self.entries.get_mut(&id.0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a record to every active observer's queue. Returns the ids
    /// that do not yet have a delivery task scheduled.
    pub fn enqueue(&mut self, record: &ObservedRecord) -> Vec<ObserverId> {
        let mut needs_task = Vec::new();
        for (&id, entry) in self.entries.iter_mut() {
            entry.queue.push(record.clone());
            if !entry.scheduled {
                entry.scheduled = true;
                needs_task.push(ObserverId(id));
            }
        }
        needs_task
    }
}
