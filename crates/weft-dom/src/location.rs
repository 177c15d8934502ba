//! Location proxy
//!
//! Stand-in for the host's location object. Reads answer from the local
//! emulation; navigations cross the channel as operations on the proxy and
//! take real effect host-side.

use url::Url;
use weft_wire::{CallArg, CallTarget, Handle, ObjectOp, StringTable};

use crate::broker::{str_arg, CallValue, ReferenceKind, ReferenceTarget};
use crate::document::Document;
use crate::registry::DOCUMENT_HANDLE;

/// Local emulation of the location object.
#[derive(Debug)]
pub struct LocationTarget {
    url: Option<Url>,
    raw: String,
}

impl LocationTarget {
    pub fn new(url_str: &str) -> Self {
        let url = Url::parse(url_str).ok();
        if url.is_none() {
            tracing::debug!(url = url_str, "location URL failed to parse");
        }
        Self { url, raw: url_str.to_string() }
    }

    /// Full URL.
    pub fn href(&self) -> String {
        self.url.as_ref().map(|url| url.to_string()).unwrap_or_else(|| self.raw.clone())
    }

    /// Protocol including the trailing colon, e.g. `"https:"`.
    pub fn protocol(&self) -> String {
        self.url.as_ref().map(|url| format!("{}:", url.scheme())).unwrap_or_default()
    }

    /// Hostname plus port when one is explicit.
    pub fn host(&self) -> String {
        let Some(url) = self.url.as_ref() else { return String::new() };
        let hostname = url.host_str().unwrap_or("");
        match url.port() {
            Some(port) => format!("{hostname}:{port}"),
            None => hostname.to_string(),
        }
    }

    /// Hostname only.
    pub fn hostname(&self) -> String {
        self.url
            .as_ref()
            .and_then(Url::host_str)
            .unwrap_or("")
            .to_string()
    }

    /// Port, empty when implicit.
    pub fn port(&self) -> String {
        self.url
            .as_ref()
            .and_then(Url::port)
            .map(|port| port.to_string())
            .unwrap_or_default()
    }

    /// Path component.
    pub fn pathname(&self) -> String {
        self.url.as_ref().map(|url| url.path().to_string()).unwrap_or_default()
    }

    /// Query string including the leading `?`, empty when absent.
    pub fn search(&self) -> String {
        self.url
            .as_ref()
            .and_then(Url::query)
            .map(|query| format!("?{query}"))
            .unwrap_or_default()
    }

    /// Fragment including the leading `#`, empty when absent.
    pub fn hash(&self) -> String {
        self.url
            .as_ref()
            .and_then(Url::fragment)
            .map(|fragment| format!("#{fragment}"))
            .unwrap_or_default()
    }

    /// Serialized origin; opaque origins read as `"null"`.
    pub fn origin(&self) -> String {
        self.url
            .as_ref()
            .map(|url| url.origin().ascii_serialization())
            .unwrap_or_default()
    }

    fn navigate(&mut self, target: &str) {
        // Relative targets resolve against the current URL when possible.
        let parsed = match self.url.as_ref() {
            Some(base) => base.join(target).ok(),
            None => Url::parse(target).ok(),
        };
        match parsed {
            Some(url) => {
                self.raw = url.to_string();
                self.url = Some(url);
            }
            None => tracing::debug!(target, "navigation target failed to parse"),
        }
    }

    fn set_hash(&mut self, hash: &str) {
        if let Some(url) = self.url.as_mut() {
            let trimmed = hash.strip_prefix('#').unwrap_or(hash);
            url.set_fragment((!trimmed.is_empty()).then_some(trimmed));
            self.raw = url.to_string();
        }
    }
}

impl ReferenceTarget for LocationTarget {
    fn apply(&mut self, op: &ObjectOp, strings: &StringTable) {
        match op {
            ObjectOp::Call(call) => match strings.resolve(call.fn_name) {
                "assign" | "replace" => {
                    if let Some(target) = str_arg(&call.args, 0, strings) {
                        self.navigate(target);
                    }
                }
                "reload" => {}
                other => tracing::trace!(fn_name = other, "unrecognized location operation"),
            },
            ObjectOp::Set { name, value } => {
                match strings.resolve(*name) {
                    "href" => {
                        if let CallArg::Str(id) = value {
                            self.navigate(strings.resolve(*id));
                        }
                    }
                    "hash" => {
                        if let CallArg::Str(id) = value {
                            self.set_hash(strings.resolve(*id));
                        }
                    }
                    other => tracing::trace!(property = other, "unrecognized location property"),
                }
            }
        }
    }
}

impl Document {
    /// Handle of the location proxy, requested from the host on first use.
    pub fn location(&mut self) -> Handle {
        if let Some(handle) = self.location_handle {
            return handle;
        }
        let emulation = Box::new(LocationTarget::new(&self.url));
        let handle = self.request_reference(
            CallTarget::Node(DOCUMENT_HANDLE),
            "location",
            Vec::new(),
            ReferenceKind::Location,
            Some(emulation),
        );
        self.location_handle = Some(handle);
        handle
    }

    /// Navigate, adding a history entry host-side.
    pub fn location_assign(&mut self, target: &str) {
        let location = self.location();
        self.call_reference(location, "assign", vec![CallValue::Str(target.to_string())]);
    }

    /// Navigate, replacing the current history entry host-side.
    pub fn location_replace(&mut self, target: &str) {
        let location = self.location();
        self.call_reference(location, "replace", vec![CallValue::Str(target.to_string())]);
    }

    pub fn location_reload(&mut self) {
        let location = self.location();
        self.call_reference(location, "reload", Vec::new());
    }

    pub fn set_location_href(&mut self, target: &str) {
        let location = self.location();
        self.set_reference_property(location, "href", CallValue::Str(target.to_string()));
    }

    pub fn set_location_hash(&mut self, hash: &str) {
        let location = self.location();
        self.set_reference_property(location, "hash", CallValue::Str(hash.to_string()));
    }

    /// Snapshot of the emulated location.
    pub fn location_href(&mut self) -> String {
        let location = self.location();
        self.broker
            .emulation::<LocationTarget>(location)
            .map(LocationTarget::href)
            .unwrap_or_else(|| self.url.clone())
    }
}
