//! Mutation queue
//!
//! The phase machine around the open batch. The first record of a turn
//! flips Idle to Mutating and schedules exactly one flush task; closing the
//! batch returns to Idle before anything else runs, so mutations performed
//! as delivery side effects open a fresh batch.

use weft_wire::{ChangeRecord, NodeDescriptor, PendingBatch, StringTable};

use crate::arena::NodeArena;
use crate::schedule::{TurnQueue, TurnTask};

/// Batch phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Mutating,
}

/// The open batch plus its phase. One instance per document.
#[derive(Debug)]
pub(crate) struct MutationQueue {
    pub phase: Phase,
    pub batch: PendingBatch,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self { phase: Phase::Idle, batch: PendingBatch::new() }
    }

    /// Append one record. Captures creation descriptors for nodes the
    /// record references for the first time, coalesces same-target
    /// character data, and schedules the flush when this record opens the
    /// batch.
    pub fn push(
        &mut self,
        arena: &mut NodeArena,
        strings: &mut StringTable,
        scheduler: &mut TurnQueue,
        record: ChangeRecord,
    ) {
        capture_descriptors(arena, strings, &mut self.batch, &record);
        let merged = if let ChangeRecord::CharacterData { target, value } = &record {
            self.batch.merge_character_data(*target, *value)
        } else {
            false
        };
        if !merged {
            self.batch.records.push(record);
        }
        if self.phase == Phase::Idle {
            self.phase = Phase::Mutating;
            scheduler.schedule(TurnTask::FlushMutations);
        }
    }

    /// Detach the batch for encoding, returning to Idle first.
    pub fn close(&mut self) -> PendingBatch {
        self.phase = Phase::Idle;
        std::mem::take(&mut self.batch)
    }
}

/// Flip `transmitted` and append a creation descriptor for every node the
/// record mentions that has not crossed the channel yet. The pre-assigned
/// skeleton is created already transmitted and never lands here.
fn capture_descriptors(
    arena: &mut NodeArena,
    strings: &mut StringTable,
    batch: &mut PendingBatch,
    record: &ChangeRecord,
) {
    let mut handles = Vec::new();
    record.collect_node_handles(&mut handles);
    for handle in handles {
        let Some(node) = arena.get_mut(handle) else { continue };
        if node.transmitted {
            continue;
        }
        node.transmitted = true;
        let node_type = node.node_type();
        let name = strings.intern(node.name());
        let text = node.character_data().map(|text| strings.intern(text));
        let namespace = node.as_element().map(|element| strings.intern(&element.namespace));
        batch.descriptors.push(NodeDescriptor { handle, node_type, name, text, namespace });
    }
}
