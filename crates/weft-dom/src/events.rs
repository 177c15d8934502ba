//! Events
//!
//! Worker-side listener registry plus the event object handlers receive.
//! Registration state also drives the transfer records: the host hears only
//! the 0 -> 1 transition per (node, type) and every removal's remaining
//! count, never each individual registration.

use std::collections::{HashMap, HashSet};

use weft_wire::{Handle, ListenerFlags};

use crate::document::Document;

/// Event delivered to worker-side handlers, usually replayed from the host.
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub event_type: String,
    pub target: Handle,
    pub bubbles: bool,
    pub cancelable: bool,
    default_prevented: bool,
}

impl DomEvent {
    pub fn new(event_type: &str, target: Handle) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            bubbles: false,
            cancelable: false,
            default_prevented: false,
        }
    }

    /// Create a click event
    pub fn click(target: Handle) -> Self {
        Self {
            event_type: "click".to_string(),
            target,
            bubbles: true,
            cancelable: true,
            default_prevented: false,
        }
    }

    /// Create an input event
    pub fn input(target: Handle) -> Self {
        Self {
            event_type: "input".to_string(),
            target,
            bubbles: true,
            cancelable: false,
            default_prevented: false,
        }
    }

    /// Create a change event
    pub fn change(target: Handle) -> Self {
        Self {
            event_type: "change".to_string(),
            target,
            bubbles: true,
            cancelable: false,
            default_prevented: false,
        }
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Identifier returned by `add_event_listener`, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u32);

pub(crate) type EventHandler = Box<dyn FnMut(&mut Document, &mut DomEvent)>;

pub(crate) struct ListenerEntry {
    pub id: ListenerId,
    pub flags: ListenerFlags,
    pub callback: EventHandler,
}

/// One dispatch pass with its pair's entries taken out of the map.
struct InFlightPair {
    target: Handle,
    event_type: String,
    /// (id, flags) of taken entries still considered registered.
    live: Vec<(ListenerId, ListenerFlags)>,
    /// Ids unregistered while the entries were out.
    tombstones: Vec<ListenerId>,
}

/// Handlers keyed by (node, event type), in registration order.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: HashMap<(Handle, String), Vec<ListenerEntry>>,
    /// Pairs whose entries are temporarily out for a running dispatch, so
    /// counts and removals stay correct when a handler touches the same
    /// pair during delivery.
    in_flight: Vec<InFlightPair>,
    /// Event types already announced on the channel.
    seen_types: HashSet<String>,
    next: u32,
}

impl ListenerRegistry {
    /// Locally-registered handlers for the pair, including any currently
    /// taken out for dispatch.
    pub fn count(&self, target: Handle, event_type: &str) -> usize {
        let stored = self
            .listeners
            .get(&(target, event_type.to_string()))
            .map_or(0, Vec::len);
        let dispatching: usize = self
            .in_flight
            .iter()
            .filter(|pair| pair.target == target && pair.event_type == event_type)
            .map(|pair| pair.live.len())
            .sum();
        stored + dispatching
    }

    pub fn insert(
        &mut self,
        target: Handle,
        event_type: &str,
        flags: ListenerFlags,
        callback: EventHandler,
    ) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.listeners
            .entry((target, event_type.to_string()))
            .or_default()
            .push(ListenerEntry { id, flags, callback });
        id
    }

    /// Remove one handler by id, returning its flags. An id belonging to a
    /// pair mid-dispatch is unregistered by tombstone: it counts as gone
    /// immediately, and restore drops it instead of reviving it.
    pub fn remove(&mut self, target: Handle, event_type: &str, id: ListenerId) -> Option<ListenerFlags> {
        let key = (target, event_type.to_string());
        if let Some(entries) = self.listeners.get_mut(&key) {
            if let Some(position) = entries.iter().position(|entry| entry.id == id) {
                let flags = entries.remove(position).flags;
                if entries.is_empty() {
                    self.listeners.remove(&key);
                }
                return Some(flags);
            }
        }
        let pair = self.in_flight.iter_mut().rev().find(|pair| {
            pair.target == target
                && pair.event_type == event_type
                && pair.live.iter().any(|(live_id, _)| *live_id == id)
        })?;
        let position = pair.live.iter().position(|(live_id, _)| *live_id == id)?;
        let (_, flags) = pair.live.remove(position);
        pair.tombstones.push(id);
        Some(flags)
    }

    /// Take the pair's handlers out for a dispatch pass.
    pub fn take(&mut self, target: Handle, event_type: &str) -> Option<Vec<ListenerEntry>> {
        let entries = self.listeners.remove(&(target, event_type.to_string()))?;
        self.in_flight.push(InFlightPair {
            target,
            event_type: event_type.to_string(),
            live: entries.iter().map(|entry| (entry.id, entry.flags)).collect(),
            tombstones: Vec::new(),
        });
        Some(entries)
    }

    /// Put the surviving handlers back, ahead of any registered during the
    /// dispatch pass, dropping survivors unregistered mid-dispatch. Returns
    /// the dropped ids.
    pub fn restore(
        &mut self,
        target: Handle,
        event_type: &str,
        survivors: Vec<ListenerEntry>,
    ) -> Vec<ListenerId> {
        let position = self
            .in_flight
            .iter()
            .rposition(|pair| pair.target == target && pair.event_type == event_type);
        let tombstones = match position {
            Some(position) => self.in_flight.remove(position).tombstones,
            None => Vec::new(),
        };
        let survivors: Vec<ListenerEntry> = survivors
            .into_iter()
            .filter(|entry| !tombstones.contains(&entry.id))
            .collect();
        let key = (target, event_type.to_string());
        if survivors.is_empty() {
            if self.listeners.get(&key).is_none_or(Vec::is_empty) {
                self.listeners.remove(&key);
            }
            return tombstones;
        }
        let slot = self.listeners.entry(key).or_default();
        slot.splice(0..0, survivors);
        tombstones
    }

    /// Whether this event type has never been subscribed anywhere in the
    /// document before. Marks it seen.
    pub fn first_sighting(&mut self, event_type: &str) -> bool {
        self.seen_types.insert(event_type.to_string())
    }
}
