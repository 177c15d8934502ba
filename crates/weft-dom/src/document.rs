//! Document
//!
//! The worker-side mirrored document. Owns the arena, the string table, the
//! open batch, the turn queue, the listener and observer registries, and
//! the reference broker. Every mutating API applies the change to the local
//! tree first, then appends the matching change record; nothing here ever
//! blocks on the host.

use weft_wire::{
    encode, CallTarget, ChangeRecord, Handle, ListenerFlags, ObjectCall, ObjectOp,
    PropertyPayload, StringTable, HTML_NAMESPACE,
};

use crate::arena::NodeArena;
use crate::broker::{lower_arg, lower_args, CallValue, ReferenceBroker, ReferenceKind, ReferenceTarget};
use crate::capability::{capabilities_for, ElementCapabilities};
use crate::error::{DomError, DomResult};
use crate::events::{DomEvent, ListenerId, ListenerRegistry};
use crate::mutation::MutationQueue;
use crate::node::{Node, NodeData, PropertyValue};
use crate::observer::{ObservedRecord, ObserverOptions, ObserverRegistry};
use crate::registry::{HandleAllocator, BODY_HANDLE, DOCUMENT_HANDLE, HEAD_HANDLE, HTML_HANDLE};
use crate::schedule::{ObserverId, TurnQueue, TurnTask};
use crate::transport::{InboundMessage, Transport};

/// Construction parameters.
#[derive(Debug, Clone)]
pub struct DocumentInit {
    /// Document URL; feeds the location stand-in's local state.
    pub url: String,
}

impl Default for DocumentInit {
    fn default() -> Self {
        Self { url: "about:blank".to_string() }
    }
}

/// The worker-side mirrored document.
pub struct Document {
    pub(crate) arena: NodeArena,
    pub(crate) allocator: HandleAllocator,
    pub(crate) strings: StringTable,
    pub(crate) queue: MutationQueue,
    pub(crate) scheduler: TurnQueue,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) observers: ObserverRegistry,
    pub(crate) broker: ReferenceBroker,
    transport: Option<Box<dyn Transport>>,
    pub(crate) url: String,
    pub(crate) history_handle: Option<Handle>,
    pub(crate) location_handle: Option<Handle>,
    pub(crate) selection_handle: Option<Handle>,
}

impl Document {
    /// Create a document with the pre-transmitted skeleton: `#document`,
    /// `<html>`, `<head>`, `<body>` under fixed handles the host contract
    /// seeds on its side too. None of them ever produce a descriptor.
    pub fn new(init: DocumentInit) -> Self {
        let mut arena = NodeArena::new();

        let mut document_node = Node::document();
        document_node.transmitted = true;
        document_node.children.push(HTML_HANDLE);

        let mut html = Node::element("html", HTML_NAMESPACE);
        html.transmitted = true;
        html.parent = Some(DOCUMENT_HANDLE);
        html.children.push(HEAD_HANDLE);
        html.children.push(BODY_HANDLE);

        let mut head = Node::element("head", HTML_NAMESPACE);
        head.transmitted = true;
        head.parent = Some(HTML_HANDLE);

        let mut body = Node::element("body", HTML_NAMESPACE);
        body.transmitted = true;
        body.parent = Some(HTML_HANDLE);

        arena.insert(DOCUMENT_HANDLE, document_node);
        arena.insert(HTML_HANDLE, html);
        arena.insert(HEAD_HANDLE, head);
        arena.insert(BODY_HANDLE, body);

        Self {
            arena,
            allocator: HandleAllocator::new(),
            strings: StringTable::new(),
            queue: MutationQueue::new(),
            scheduler: TurnQueue::new(),
            listeners: ListenerRegistry::default(),
            observers: ObserverRegistry::default(),
            broker: ReferenceBroker::default(),
            transport: None,
            url: init.url,
            history_handle: None,
            location_handle: None,
            selection_handle: None,
        }
    }

    /// Attach the outbound half of the channel.
    pub fn set_transport(&mut self, transport: Box<dyn Transport>) {
        self.transport = Some(transport);
    }

    // ==================== Read surface ====================

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Handle of the `#document` node.
    pub fn handle(&self) -> Handle {
        DOCUMENT_HANDLE
    }

    /// Get `<html>` element handle.
    pub fn document_element(&self) -> Handle {
        HTML_HANDLE
    }

    /// Get `<head>` element handle.
    pub fn head(&self) -> Handle {
        HEAD_HANDLE
    }

    /// Get `<body>` element handle.
    pub fn body(&self) -> Handle {
        BODY_HANDLE
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.arena.contains(handle)
    }

    pub fn node(&self, handle: Handle) -> Option<&Node> {
        self.arena.get(handle)
    }

    pub fn parent(&self, handle: Handle) -> Option<Handle> {
        self.arena.get(handle).and_then(|node| node.parent)
    }

    pub fn children(&self, handle: Handle) -> &[Handle] {
        self.arena.get(handle).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn next_sibling(&self, handle: Handle) -> Option<Handle> {
        let parent = self.parent(handle)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&sibling| sibling == handle)?;
        siblings.get(index + 1).copied()
    }

    pub fn previous_sibling(&self, handle: Handle) -> Option<Handle> {
        let parent = self.parent(handle)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&sibling| sibling == handle)?;
        index.checked_sub(1).map(|previous| siblings[previous])
    }

    /// Element tag name, lowercase.
    pub fn tag_name(&self, handle: Handle) -> Option<&str> {
        self.arena
            .get(handle)
            .and_then(Node::as_element)
            .map(|element| element.name.as_str())
    }

    pub fn get_attribute(&self, handle: Handle, name: &str) -> Option<&str> {
        self.arena.get(handle).and_then(Node::as_element).and_then(|element| element.get_attr(name))
    }

    pub fn get_attribute_ns(&self, handle: Handle, namespace: &str, name: &str) -> Option<&str> {
        self.arena
            .get(handle)
            .and_then(Node::as_element)
            .and_then(|element| element.get_attr_ns(namespace, name))
    }

    pub fn property(&self, handle: Handle, name: &str) -> Option<&PropertyValue> {
        self.arena
            .get(handle)
            .and_then(Node::as_element)
            .and_then(|element| element.get_property(name))
    }

    /// Behavior switches for an element's tag.
    pub fn element_capabilities(&self, handle: Handle) -> Option<ElementCapabilities> {
        self.tag_name(handle).map(capabilities_for)
    }

    /// Concatenated text of the node: its own character data, or the text
    /// descendants of a container.
    pub fn text_content(&self, handle: Handle) -> String {
        match self.arena.get(handle).map(|node| &node.data) {
            Some(NodeData::Text(data)) => data.content.clone(),
            Some(NodeData::Comment(content)) => content.clone(),
            Some(_) => {
                let mut out = String::new();
                self.collect_text(handle, &mut out);
                out
            }
            None => String::new(),
        }
    }

    fn collect_text(&self, handle: Handle, out: &mut String) {
        for &child in self.children(handle) {
            match self.arena.get(child).map(|node| &node.data) {
                Some(NodeData::Text(data)) => out.push_str(&data.content),
                Some(NodeData::Element(_)) | Some(NodeData::Fragment) => {
                    self.collect_text(child, out);
                }
                _ => {}
            }
        }
    }

    /// Get element by ID (recursive search from the document root).
    pub fn get_element_by_id(&self, id: &str) -> Option<Handle> {
        self.find_element_with_id(DOCUMENT_HANDLE, id)
    }

    fn find_element_with_id(&self, start: Handle, id: &str) -> Option<Handle> {
        for &child in self.children(start) {
            if let Some(node) = self.arena.get(child) {
                if let Some(element) = node.as_element() {
                    if element.get_attr("id") == Some(id) {
                        return Some(child);
                    }
                }
                if let Some(found) = self.find_element_with_id(child, id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// All elements with the tag name, in tree order.
    pub fn get_elements_by_tag_name(&self, tag: &str) -> Vec<Handle> {
        let tag = tag.to_ascii_lowercase();
        let mut found = Vec::new();
        self.collect_elements_by_tag(DOCUMENT_HANDLE, &tag, &mut found);
        found
    }

    fn collect_elements_by_tag(&self, start: Handle, tag: &str, found: &mut Vec<Handle>) {
        for &child in self.children(start) {
            if let Some(node) = self.arena.get(child) {
                if node.as_element().is_some_and(|element| element.name == tag) {
                    found.push(child);
                }
                self.collect_elements_by_tag(child, tag, found);
            }
        }
    }

    /// Read access to the reference table (state checks, emulation peeks).
    pub fn broker(&self) -> &ReferenceBroker {
        &self.broker
    }

    /// Read access to the string table.
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    // ==================== Node creation ====================

    pub fn create_element(&mut self, tag: &str) -> Handle {
        self.create_element_ns(HTML_NAMESPACE, tag)
    }

    pub fn create_element_ns(&mut self, namespace: &str, tag: &str) -> Handle {
        let handle = self.allocator.allocate();
        self.arena.insert(handle, Node::element(tag, namespace));
        handle
    }

    pub fn create_text_node(&mut self, text: &str) -> Handle {
        let handle = self.allocator.allocate();
        self.arena.insert(handle, Node::text(text));
        handle
    }

    pub fn create_comment(&mut self, text: &str) -> Handle {
        let handle = self.allocator.allocate();
        self.arena.insert(handle, Node::comment(text));
        handle
    }

    pub fn create_document_fragment(&mut self) -> Handle {
        let handle = self.allocator.allocate();
        self.arena.insert(handle, Node::fragment());
        handle
    }

    /// Clone a node under fresh handles by replaying its construction.
    /// Creation descriptors carry no structure, so the copy's attributes
    /// and edges batch as ordinary records; the host rebuilds the subtree
    /// the same way a hand-built one arrives.
    pub fn clone_node(&mut self, source: Handle, deep: bool) -> DomResult<Handle> {
        let (data, children) = {
            let node = self.arena.get(source).ok_or(DomError::NotFound(source))?;
            (node.data.clone(), node.children.clone())
        };
        let handle = match &data {
            NodeData::Document => return Err(DomError::InvalidNodeType),
            NodeData::Fragment => self.create_document_fragment(),
            NodeData::Text(text) => self.create_text_node(&text.content),
            NodeData::Comment(content) => self.create_comment(content),
            NodeData::Element(element) => {
                let handle = self.create_element_ns(&element.namespace, &element.name);
                for attr in &element.attrs {
                    self.set_attribute_ns(handle, &attr.namespace, &attr.name, &attr.value)?;
                }
                for property in &element.properties {
                    self.set_property(handle, &property.name, property.value.clone())?;
                }
                handle
            }
        };
        if deep {
            for child in children {
                let child_clone = self.clone_node(child, true)?;
                self.append_child(handle, child_clone)?;
            }
        }
        Ok(handle)
    }

    // ==================== Tree mutation ====================

    /// Append a child node. A child attached elsewhere is detached first,
    /// with its own removal record.
    pub fn append_child(&mut self, parent: Handle, child: Handle) -> DomResult<Handle> {
        self.insert_before(parent, child, None)
    }

    /// Insert before an anchor child; `None` appends at the end.
    pub fn insert_before(
        &mut self,
        parent: Handle,
        child: Handle,
        anchor: Option<Handle>,
    ) -> DomResult<Handle> {
        self.validate_insertion(parent, child)?;
        let is_fragment = matches!(
            self.arena.get(child).map(|node| &node.data),
            Some(NodeData::Fragment)
        );
        if is_fragment {
            self.insert_fragment(parent, child, anchor)?;
            return Ok(child);
        }
        if let Some(old_parent) = self.arena.get(child).and_then(|node| node.parent) {
            self.remove_child_internal(old_parent, child);
        }
        let (index, anchor_prev) = self.insertion_point(parent, anchor)?;
        if let Some(parent_node) = self.arena.get_mut(parent) {
            parent_node.children.insert(index, child);
        }
        if let Some(child_node) = self.arena.get_mut(child) {
            child_node.parent = Some(parent);
        }
        self.push_record(
            ChangeRecord::ChildList {
                parent,
                removed: Vec::new(),
                added: vec![child],
                anchor,
                anchor_prev,
            },
            None,
        );
        Ok(child)
    }

    /// Remove a child node.
    pub fn remove_child(&mut self, parent: Handle, child: Handle) -> DomResult<Handle> {
        if !self.arena.contains(parent) {
            return Err(DomError::NotFound(parent));
        }
        let child_parent = self.arena.get(child).ok_or(DomError::NotFound(child))?.parent;
        if child_parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.remove_child_internal(parent, child);
        Ok(child)
    }

    /// Replace `old_child` with `new_child`, emitting one record carrying
    /// both the removal and the insertion.
    pub fn replace_child(
        &mut self,
        parent: Handle,
        new_child: Handle,
        old_child: Handle,
    ) -> DomResult<Handle> {
        self.validate_insertion(parent, new_child)?;
        let old_parent = self.arena.get(old_child).ok_or(DomError::NotFound(old_child))?.parent;
        if old_parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child: old_child });
        }
        if new_child == old_child {
            return Ok(old_child);
        }

        let is_fragment = matches!(
            self.arena.get(new_child).map(|node| &node.data),
            Some(NodeData::Fragment)
        );
        if is_fragment {
            let anchor = self.next_sibling(old_child);
            self.remove_child_internal(parent, old_child);
            self.insert_fragment(parent, new_child, anchor)?;
            return Ok(old_child);
        }

        if let Some(current) = self.arena.get(new_child).and_then(|node| node.parent) {
            self.remove_child_internal(current, new_child);
        }
        let (index, anchor, anchor_prev) = {
            let parent_node = self.arena.get(parent).ok_or(DomError::NotFound(parent))?;
            let index = parent_node
                .children
                .iter()
                .position(|&c| c == old_child)
                .ok_or(DomError::NotAChild { parent, child: old_child })?;
            let anchor = parent_node.children.get(index + 1).copied();
            let anchor_prev = index.checked_sub(1).map(|i| parent_node.children[i]);
            (index, anchor, anchor_prev)
        };
        if let Some(parent_node) = self.arena.get_mut(parent) {
            parent_node.children[index] = new_child;
        }
        if let Some(old_node) = self.arena.get_mut(old_child) {
            old_node.parent = None;
        }
        if let Some(new_node) = self.arena.get_mut(new_child) {
            new_node.parent = Some(parent);
        }
        self.push_record(
            ChangeRecord::ChildList {
                parent,
                removed: vec![old_child],
                added: vec![new_child],
                anchor,
                anchor_prev,
            },
            None,
        );
        Ok(old_child)
    }

    fn validate_insertion(&self, parent: Handle, child: Handle) -> DomResult<()> {
        let parent_node = self.arena.get(parent).ok_or(DomError::NotFound(parent))?;
        let child_node = self.arena.get(child).ok_or(DomError::NotFound(child))?;
        if !parent_node.is_container() {
            return Err(DomError::HierarchyRequest("parent cannot hold children"));
        }
        if matches!(child_node.data, NodeData::Document) {
            return Err(DomError::HierarchyRequest("a document cannot be inserted"));
        }
        if self.is_same_or_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest("node is an ancestor of the insertion parent"));
        }
        Ok(())
    }

    fn is_same_or_ancestor(&self, candidate: Handle, of: Handle) -> bool {
        let mut cursor = Some(of);
        while let Some(handle) = cursor {
            if handle == candidate {
                return true;
            }
            cursor = self.arena.get(handle).and_then(|node| node.parent);
        }
        false
    }

    /// Index to insert at plus the previous sibling of the insertion point.
    fn insertion_point(
        &self,
        parent: Handle,
        anchor: Option<Handle>,
    ) -> DomResult<(usize, Option<Handle>)> {
        let parent_node = self.arena.get(parent).ok_or(DomError::NotFound(parent))?;
        match anchor {
            Some(anchor_handle) => {
                let index = parent_node
                    .children
                    .iter()
                    .position(|&c| c == anchor_handle)
                    .ok_or(DomError::NotAChild { parent, child: anchor_handle })?;
                let anchor_prev = index.checked_sub(1).map(|i| parent_node.children[i]);
                Ok((index, anchor_prev))
            }
            None => Ok((parent_node.children.len(), parent_node.children.last().copied())),
        }
    }

    /// Move a fragment's children into `parent` as one multi-added record.
    /// The fragment node itself never crosses the channel.
    fn insert_fragment(
        &mut self,
        parent: Handle,
        fragment: Handle,
        anchor: Option<Handle>,
    ) -> DomResult<()> {
        let moved: Vec<Handle> = {
            let fragment_node = self.arena.get_mut(fragment).ok_or(DomError::NotFound(fragment))?;
            std::mem::take(&mut fragment_node.children)
        };
        if moved.is_empty() {
            return Ok(());
        }
        let (index, anchor_prev) = self.insertion_point(parent, anchor)?;
        if let Some(parent_node) = self.arena.get_mut(parent) {
            parent_node.children.splice(index..index, moved.iter().copied());
        }
        for &handle in &moved {
            if let Some(node) = self.arena.get_mut(handle) {
                node.parent = Some(parent);
            }
        }
        self.push_record(
            ChangeRecord::ChildList {
                parent,
                removed: Vec::new(),
                added: moved,
                anchor,
                anchor_prev,
            },
            None,
        );
        Ok(())
    }

    fn remove_child_internal(&mut self, parent: Handle, child: Handle) {
        if let Some(parent_node) = self.arena.get_mut(parent) {
            parent_node.children.retain(|&c| c != child);
        }
        if let Some(child_node) = self.arena.get_mut(child) {
            child_node.parent = None;
        }
        self.push_record(
            ChangeRecord::ChildList {
                parent,
                removed: vec![child],
                added: Vec::new(),
                anchor: None,
                anchor_prev: None,
            },
            None,
        );
    }

    // ==================== Attributes, text, properties ====================

    pub fn set_attribute(&mut self, target: Handle, name: &str, value: &str) -> DomResult<()> {
        self.set_attribute_ns(target, HTML_NAMESPACE, name, value)
    }

    pub fn set_attribute_ns(
        &mut self,
        target: Handle,
        namespace: &str,
        name: &str,
        value: &str,
    ) -> DomResult<()> {
        let old = {
            let node = self.arena.get_mut(target).ok_or(DomError::NotFound(target))?;
            let element = node.as_element_mut().ok_or(DomError::InvalidNodeType)?;
            element.set_attr(namespace, name, value)
        };
        let name_id = self.strings.intern(name);
        let namespace_id = self.strings.intern(namespace);
        let value_id = self.strings.intern(value);
        self.push_record(
            ChangeRecord::Attributes {
                target,
                name: name_id,
                namespace: namespace_id,
                value: Some(value_id),
            },
            old,
        );
        Ok(())
    }

    /// Remove an attribute. Removing one that does not exist is a no-op and
    /// emits nothing.
    pub fn remove_attribute(&mut self, target: Handle, name: &str) -> DomResult<()> {
        self.remove_attribute_ns(target, HTML_NAMESPACE, name)
    }

    pub fn remove_attribute_ns(
        &mut self,
        target: Handle,
        namespace: &str,
        name: &str,
    ) -> DomResult<()> {
        let old = {
            let node = self.arena.get_mut(target).ok_or(DomError::NotFound(target))?;
            let element = node.as_element_mut().ok_or(DomError::InvalidNodeType)?;
            element.remove_attr(namespace, name)
        };
        let Some(old) = old else { return Ok(()) };
        let name_id = self.strings.intern(name);
        let namespace_id = self.strings.intern(namespace);
        self.push_record(
            ChangeRecord::Attributes { target, name: name_id, namespace: namespace_id, value: None },
            Some(old),
        );
        Ok(())
    }

    /// Replace the character data of a text or comment node. Same-turn
    /// writes to the same node coalesce into one record.
    pub fn set_data(&mut self, target: Handle, text: &str) -> DomResult<()> {
        let old = {
            let node = self.arena.get_mut(target).ok_or(DomError::NotFound(target))?;
            match &mut node.data {
                NodeData::Text(data) => std::mem::replace(&mut data.content, text.to_string()),
                NodeData::Comment(content) => std::mem::replace(content, text.to_string()),
                _ => return Err(DomError::InvalidNodeType),
            }
        };
        let value = self.strings.intern(text);
        self.push_record(ChangeRecord::CharacterData { target, value }, Some(old));
        Ok(())
    }

    /// Set the text content of a node. A container whose only child is a
    /// text node routes through that node's character data, so repeated
    /// same-turn sets coalesce; otherwise existing children are replaced by
    /// one fresh text node.
    pub fn set_text_content(&mut self, target: Handle, text: &str) -> DomResult<()> {
        let is_character_data = matches!(
            self.arena.get(target).map(|node| &node.data),
            Some(NodeData::Text(_)) | Some(NodeData::Comment(_))
        );
        if is_character_data {
            return self.set_data(target, text);
        }
        let children = self.arena.get(target).ok_or(DomError::NotFound(target))?.children.clone();
        if children.len() == 1 {
            let only_child = children[0];
            if self.arena.get(only_child).is_some_and(Node::is_text) {
                return self.set_data(only_child, text);
            }
        }
        for &child in &children {
            if let Some(child_node) = self.arena.get_mut(child) {
                child_node.parent = None;
            }
        }
        if let Some(node) = self.arena.get_mut(target) {
            node.children.clear();
        }
        let added = if text.is_empty() {
            Vec::new()
        } else {
            let text_handle = self.create_text_node(text);
            if let Some(text_node) = self.arena.get_mut(text_handle) {
                text_node.parent = Some(target);
            }
            if let Some(node) = self.arena.get_mut(target) {
                node.children.push(text_handle);
            }
            vec![text_handle]
        };
        if children.is_empty() && added.is_empty() {
            return Ok(());
        }
        self.push_record(
            ChangeRecord::ChildList {
                parent: target,
                removed: children,
                added,
                anchor: None,
                anchor_prev: None,
            },
            None,
        );
        Ok(())
    }

    /// Set a mirrored element property (`value`, `checked`, ...).
    pub fn set_property(&mut self, target: Handle, name: &str, value: PropertyValue) -> DomResult<()> {
        {
            let node = self.arena.get_mut(target).ok_or(DomError::NotFound(target))?;
            let element = node.as_element_mut().ok_or(DomError::InvalidNodeType)?;
            element.set_property(name, value.clone());
        }
        let name_id = self.strings.intern(name);
        let payload = match &value {
            PropertyValue::Text(text) => PropertyPayload::Text(self.strings.intern(text)),
            PropertyValue::Flag(flag) => PropertyPayload::Flag(*flag),
        };
        self.push_record(ChangeRecord::Properties { target, name: name_id, value: payload }, None);
        Ok(())
    }

    // ==================== Event subscription ====================

    /// Register a handler. Only the 0 -> 1 transition for the (node, type)
    /// pair emits a subscription record; the first document-wide sighting
    /// of the type also announces it in the batch.
    pub fn add_event_listener<F>(
        &mut self,
        target: Handle,
        event_type: &str,
        flags: ListenerFlags,
        handler: F,
    ) -> DomResult<ListenerId>
    where
        F: FnMut(&mut Document, &mut DomEvent) + 'static,
    {
        if !self.arena.contains(target) {
            return Err(DomError::NotFound(target));
        }
        let count_before = self.listeners.count(target, event_type);
        let id = self.listeners.insert(target, event_type, flags, Box::new(handler));
        if count_before == 0 {
            let type_id = self.strings.intern(event_type);
            if self.listeners.first_sighting(event_type) {
                self.queue.batch.new_event_types.push(type_id);
            }
            self.push_record(
                ChangeRecord::EventSubscription { target, remaining: 1, event_type: type_id, flags },
                None,
            );
        }
        Ok(id)
    }

    /// Remove a handler by id. Every successful removal emits a record
    /// carrying the remaining count; removing an unknown id is a no-op.
    /// Unregistering from inside a handler of the same pair succeeds too;
    /// the in-flight dispatch still runs its snapshot, later ones skip it.
    pub fn remove_event_listener(&mut self, target: Handle, event_type: &str, id: ListenerId) -> bool {
        let Some(flags) = self.listeners.remove(target, event_type, id) else {
            return false;
        };
        let remaining = self.listeners.count(target, event_type) as u32;
        let type_id = self.strings.intern(event_type);
        self.push_record(
            ChangeRecord::EventSubscription { target, remaining, event_type: type_id, flags },
            None,
        );
        true
    }

    /// Invoke the local handlers for exactly the event's (node, type) pair,
    /// in registration order. `once` handlers auto-remove afterwards,
    /// emitting the same record a manual removal would. Returns `false`
    /// when a handler prevented the default action.
    pub fn dispatch_event(&mut self, event: DomEvent) -> bool {
        let mut event = event;
        let event_type = event.event_type.clone();
        let target = event.target;
        let Some(entries) = self.listeners.take(target, &event_type) else {
            tracing::trace!(
                target = target.as_u32(),
                event_type = %event_type,
                "event with no local handlers"
            );
            return true;
        };
        let mut survivors = Vec::with_capacity(entries.len());
        let mut auto_removed = Vec::new();
        for mut entry in entries {
            let once = entry.flags.once;
            (entry.callback)(self, &mut event);
            if once {
                auto_removed.push((entry.id, entry.flags));
            } else {
                survivors.push(entry);
            }
        }
        let unregistered = self.listeners.restore(target, &event_type, survivors);
        // Auto-removals read as sequential removals on the wire. A once
        // handler unregistered mid-dispatch already emitted its record.
        let auto_removed: Vec<(ListenerId, ListenerFlags)> = auto_removed
            .into_iter()
            .filter(|(id, _)| !unregistered.contains(id))
            .collect();
        let final_count = self.listeners.count(target, &event_type) as u32;
        let removals = auto_removed.len() as u32;
        for (index, (_, flags)) in auto_removed.into_iter().enumerate() {
            let remaining = final_count + removals - 1 - index as u32;
            let type_id = self.strings.intern(&event_type);
            self.push_record(
                ChangeRecord::EventSubscription { target, remaining, event_type: type_id, flags },
                None,
            );
        }
        !event.is_default_prevented()
    }

    // ==================== Local observer ====================

    /// Subscribe a callback to changes applied to this document. The target
    /// and options are kept on the subscription; delivery is document-wide.
    pub fn observe<F>(&mut self, target: Handle, options: ObserverOptions, callback: F) -> ObserverId
    where
        F: FnMut(&mut Document, Vec<ObservedRecord>) + 'static,
    {
        self.observers.register(target, options, Box::new(callback))
    }

    /// The target and options an observer was registered with.
    pub fn observer_scope(&self, id: ObserverId) -> Option<(Handle, ObserverOptions)> {
        self.observers.get(id).map(|entry| (entry.target, entry.options))
    }

    /// Unsubscribe, discarding any undelivered records for this observer
    /// only. The channel batch is unaffected.
    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let removed = self.observers.remove(id).is_some();
        if removed {
            tracing::debug!(observer = id.0, "observer disconnected");
        }
        removed
    }

    /// Drain an observer's queued records synchronously. The scheduled
    /// delivery, if any, then finds an empty queue and does nothing.
    pub fn take_records(&mut self, id: ObserverId) -> Vec<ObservedRecord> {
        self.observers
            .get_mut(id)
            .map(|entry| std::mem::take(&mut entry.queue))
            .unwrap_or_default()
    }

    // ==================== Reference broker ====================

    /// Ask the host to invoke `fn_name(args)` on `owner`'s counterpart and
    /// materialize the result under a fresh handle, returned synchronously.
    pub fn request_reference(
        &mut self,
        owner: CallTarget,
        fn_name: &str,
        args: Vec<CallValue>,
        kind: ReferenceKind,
        emulation: Option<Box<dyn ReferenceTarget>>,
    ) -> Handle {
        let handle = self.allocator.allocate();
        let call = ObjectCall {
            fn_name: self.strings.intern(fn_name),
            target: owner,
            args: lower_args(&mut self.strings, args),
        };
        self.broker.register(handle, kind, emulation);
        self.push_record(ChangeRecord::ObjectCreate { call, result: handle }, None);
        tracing::debug!(handle = handle.as_u32(), kind = ?kind, fn_name, "reference requested");
        handle
    }

    /// Invoke `fn_name(args)` against a reference stand-in. Never blocks:
    /// pending references queue the call for replay on resolution.
    pub fn call_reference(&mut self, reference: Handle, fn_name: &str, args: Vec<CallValue>) {
        let call = ObjectCall {
            fn_name: self.strings.intern(fn_name),
            target: CallTarget::Reference(reference),
            args: lower_args(&mut self.strings, args),
        };
        self.push_record(ChangeRecord::ObjectCall(call.clone()), None);
        self.broker.record_op(reference, ObjectOp::Call(call), &self.strings);
    }

    /// Write a property on a reference stand-in's host counterpart.
    pub fn set_reference_property(&mut self, reference: Handle, name: &str, value: CallValue) {
        let name_id = self.strings.intern(name);
        let arg = lower_arg(&mut self.strings, value);
        self.push_record(
            ChangeRecord::ObjectMutation {
                target: CallTarget::Reference(reference),
                name: name_id,
                value: arg.clone(),
            },
            None,
        );
        self.broker.record_op(reference, ObjectOp::Set { name: name_id, value: arg }, &self.strings);
    }

    /// Request a rendering context for a canvas element. Kind validation is
    /// the caller's concern; this emits the request and registers the
    /// pending entry.
    pub fn request_render_context(
        &mut self,
        canvas: Handle,
        kind: &str,
        emulation: Option<Box<dyn ReferenceTarget>>,
    ) -> DomResult<Handle> {
        if !self.arena.contains(canvas) {
            return Err(DomError::NotFound(canvas));
        }
        let context = self.allocator.allocate();
        let kind_id = self.strings.intern(kind);
        self.broker.register(context, ReferenceKind::RenderContext, emulation);
        self.push_record(
            ChangeRecord::RenderContextRequest { canvas, context, kind: kind_id },
            None,
        );
        Ok(context)
    }

    /// Request an image handle for a source node's current contents.
    pub fn request_image_handle(&mut self, source: Handle) -> DomResult<Handle> {
        if !self.arena.contains(source) {
            return Err(DomError::NotFound(source));
        }
        let image = self.allocator.allocate();
        self.broker.register(image, ReferenceKind::ImageBitmap, None);
        self.push_record(ChangeRecord::ImageHandleRequest { source, image }, None);
        Ok(image)
    }

    /// Consume one host reply.
    pub fn receive(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::ReferenceResolved { handle, target } => {
                self.broker.resolve(handle, target, &self.strings);
            }
            InboundMessage::ReferenceFailed { handle, reason } => {
                self.broker.fail(handle, &reason);
            }
            InboundMessage::Event(event) => {
                self.dispatch_event(event);
            }
        }
    }

    // ==================== Scheduling ====================

    /// Run one turn: process exactly the tasks queued before the turn
    /// began. Tasks scheduled while the turn runs wait for a later turn.
    pub fn run_turn(&mut self) {
        let queued = self.scheduler.len();
        for _ in 0..queued {
            let Some(task) = self.scheduler.pop() else { break };
            match task {
                TurnTask::FlushMutations => self.flush_mutations(),
                TurnTask::NotifyObserver(id) => self.notify_observer(id),
            }
        }
    }

    /// Run turns until no tasks remain.
    pub fn run_until_idle(&mut self) {
        while self.has_pending_work() {
            self.run_turn();
        }
    }

    /// Check if there's pending scheduled work.
    pub fn has_pending_work(&self) -> bool {
        !self.scheduler.is_empty()
    }

    // ==================== Internals ====================

    /// Feed observers, then append to the open batch (capturing
    /// descriptors, coalescing, scheduling the flush).
    pub(crate) fn push_record(&mut self, record: ChangeRecord, old_value: Option<String>) {
        if !self.observers.is_empty() {
            let observed = ObservedRecord::from_change(&record, &self.strings, old_value);
            for id in self.observers.enqueue(&observed) {
                self.scheduler.schedule(TurnTask::NotifyObserver(id));
            }
        }
        self.queue.push(&mut self.arena, &mut self.strings, &mut self.scheduler, record);
    }

    /// Close the batch and post it. The phase returns to Idle before the
    /// encoder runs, so mutations performed as delivery side effects open a
    /// fresh batch.
    fn flush_mutations(&mut self) {
        let batch = self.queue.close();
        if batch.is_empty() {
            return;
        }
        let delta = self.strings.take_delta();
        let envelope = encode(batch, delta);
        tracing::debug!(
            strings = envelope.strings.len(),
            descriptors = envelope.nodes.len() / 5,
            mutation_words = envelope.mutations.len(),
            "flushing batch"
        );
        match self.transport.as_mut() {
            Some(transport) => transport.post(envelope),
            None => tracing::trace!("no transport attached, envelope dropped"),
        }
    }

    fn notify_observer(&mut self, id: ObserverId) {
        let (records, callback) = {
            let Some(entry) = self.observers.get_mut(id) else { return };
            entry.scheduled = false;
            if entry.queue.is_empty() {
                return;
            }
            (std::mem::take(&mut entry.queue), entry.callback.take())
        };
        let Some(mut callback) = callback else { return };
        callback(self, records);
        if let Some(entry) = self.observers.get_mut(id) {
            entry.callback = Some(callback);
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DocumentInit::default())
    }
}
