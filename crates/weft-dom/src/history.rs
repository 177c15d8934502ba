//! History proxy
//!
//! Session-history stand-in. The real history lives with the host; the
//! local emulation tracks the entry stack so `history_length` and
//! `history_state` answer without a round trip.

use weft_wire::{CallTarget, Handle, ObjectOp, StringTable};

use crate::broker::{int_arg, str_arg, CallValue, ReferenceKind, ReferenceTarget};
use crate::document::Document;
use crate::registry::DOCUMENT_HANDLE;

/// One session-history entry.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    /// JSON-serialized state, when any.
    pub state: Option<String>,
}

/// Local emulation of the host history stack.
#[derive(Debug)]
pub struct HistoryTarget {
    entries: Vec<HistoryEntry>,
    current: usize,
}

impl HistoryTarget {
    pub fn new(initial_url: &str) -> Self {
        Self {
            entries: vec![HistoryEntry {
                url: initial_url.to_string(),
                title: String::new(),
                state: None,
            }],
            current: 0,
        }
    }

    /// Push a new entry, dropping any forward history.
    fn push_state(&mut self, state: Option<String>, title: String, url: String) {
        self.entries.truncate(self.current + 1);
        self.entries.push(HistoryEntry { url, title, state });
        self.current = self.entries.len() - 1;
    }

    /// Replace the current entry in place.
    fn replace_state(&mut self, state: Option<String>, title: String, url: String) {
        if let Some(entry) = self.entries.get_mut(self.current) {
            entry.url = url;
            entry.title = title;
            entry.state = state;
        }
    }

    fn back(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    fn forward(&mut self) {
        if self.current + 1 < self.entries.len() {
            self.current += 1;
        }
    }

    /// Move by a signed offset; out-of-range offsets do nothing.
    fn go(&mut self, delta: i32) {
        let target = self.current as i64 + i64::from(delta);
        if (0..self.entries.len() as i64).contains(&target) {
            self.current = target as usize;
        }
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.current]
    }

    pub fn length(&self) -> usize {
        self.entries.len()
    }

    pub fn state(&self) -> Option<&str> {
        self.current().state.as_deref()
    }
}

impl ReferenceTarget for HistoryTarget {
    fn apply(&mut self, op: &ObjectOp, strings: &StringTable) {
        let ObjectOp::Call(call) = op else { return };
        match strings.resolve(call.fn_name) {
            name @ ("pushState" | "replaceState") => {
                // Empty state text stands for "no state".
                let state = str_arg(&call.args, 0, strings)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string);
                let title = str_arg(&call.args, 1, strings).unwrap_or_default().to_string();
                let url = str_arg(&call.args, 2, strings).unwrap_or_default().to_string();
                if name == "pushState" {
                    self.push_state(state, title, url);
                } else {
                    self.replace_state(state, title, url);
                }
            }
            "back" => self.back(),
            "forward" => self.forward(),
            "go" => {
                if let Some(delta) = int_arg(&call.args, 0) {
                    self.go(delta);
                }
            }
            other => tracing::trace!(fn_name = other, "unrecognized history operation"),
        }
    }
}

impl Document {
    /// Handle of the history proxy, requested from the host on first use.
    pub fn history(&mut self) -> Handle {
        if let Some(handle) = self.history_handle {
            return handle;
        }
        let emulation = Box::new(HistoryTarget::new(&self.url));
        let handle = self.request_reference(
            CallTarget::Node(DOCUMENT_HANDLE),
            "history",
            Vec::new(),
            ReferenceKind::History,
            Some(emulation),
        );
        self.history_handle = Some(handle);
        handle
    }

    /// Push an entry. `state` is its serialized JSON, or `None`.
    pub fn push_state(&mut self, state: Option<&str>, title: &str, url: &str) {
        let history = self.history();
        let args = vec![
            CallValue::Str(state.unwrap_or_default().to_string()),
            CallValue::Str(title.to_string()),
            CallValue::Str(url.to_string()),
        ];
        self.call_reference(history, "pushState", args);
    }

    /// Replace the current entry.
    pub fn replace_state(&mut self, state: Option<&str>, title: &str, url: &str) {
        let history = self.history();
        let args = vec![
            CallValue::Str(state.unwrap_or_default().to_string()),
            CallValue::Str(title.to_string()),
            CallValue::Str(url.to_string()),
        ];
        self.call_reference(history, "replaceState", args);
    }

    pub fn history_back(&mut self) {
        let history = self.history();
        self.call_reference(history, "back", Vec::new());
    }

    pub fn history_forward(&mut self) {
        let history = self.history();
        self.call_reference(history, "forward", Vec::new());
    }

    pub fn history_go(&mut self, delta: i32) {
        let history = self.history();
        self.call_reference(history, "go", vec![CallValue::Int(delta)]);
    }

    /// Entry count per the local emulation.
    pub fn history_length(&mut self) -> usize {
        let history = self.history();
        self.broker.emulation::<HistoryTarget>(history).map_or(1, HistoryTarget::length)
    }

    /// Serialized state of the current entry per the local emulation.
    pub fn history_state(&mut self) -> Option<String> {
        let history = self.history();
        self.broker
            .emulation::<HistoryTarget>(history)
            .and_then(|target| target.state().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentInit;

    fn test_document() -> Document {
        Document::new(DocumentInit { url: "https://example.com/start".to_string() })
    }

    #[test]
    fn test_push_state_grows_and_truncates_forward() {
        let mut document = test_document();
        document.push_state(None, "", "/a");
        document.push_state(Some(r#"{"step":2}"#), "", "/b");
        assert_eq!(document.history_length(), 3);
        assert_eq!(document.history_state(), Some(r#"{"step":2}"#.to_string()));

        document.history_back();
        assert_eq!(document.history_state(), None);
        document.push_state(None, "", "/c");
        // /b was forward history; the push dropped it.
        assert_eq!(document.history_length(), 3);
    }

    #[test]
    fn test_back_saturates_and_go_is_bounds_checked() {
        let mut document = test_document();
        document.history_back();
        document.history_back();
        assert_eq!(document.history_length(), 1);

        document.push_state(None, "", "/a");
        document.history_go(-5);
        document.history_go(1);
        let history = document.history();
        let target = document.broker().emulation::<HistoryTarget>(history).unwrap();
        assert_eq!(target.current().url, "/a");
    }

    #[test]
    fn test_replace_state_keeps_length() {
        let mut document = test_document();
        document.push_state(None, "", "/a");
        document.replace_state(Some("7"), "title", "/a2");
        assert_eq!(document.history_length(), 2);
        let history = document.history();
        let target = document.broker().emulation::<HistoryTarget>(history).unwrap();
        assert_eq!(target.current().url, "/a2");
        assert_eq!(target.current().title, "title");
        assert_eq!(target.state(), Some("7"));
    }
}
