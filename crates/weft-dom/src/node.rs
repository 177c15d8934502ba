//! Mirrored node
//!
//! In-worker representation of one DOM node. Kept deliberately flat: handle
//! relations instead of pointers, a data enum for the per-type payload, and
//! a `transmitted` flag driving descriptor capture.

use weft_wire::{Handle, NodeType};

/// One node in the mirrored tree.
#[derive(Debug)]
pub struct Node {
    pub parent: Option<Handle>,
    pub children: Vec<Handle>,
    /// Whether this node's creation descriptor has crossed the channel.
    pub transmitted: bool,
    pub data: NodeData,
}

impl Node {
    pub fn element(name: &str, namespace: &str) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transmitted: false,
            data: NodeData::Element(ElementData::new(name, namespace)),
        }
    }

    pub fn text(content: &str) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transmitted: false,
            data: NodeData::Text(TextData { content: content.to_string() }),
        }
    }

    pub fn comment(content: &str) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transmitted: false,
            data: NodeData::Comment(content.to_string()),
        }
    }

    pub fn document() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transmitted: false,
            data: NodeData::Document,
        }
    }

    pub fn fragment() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transmitted: false,
            data: NodeData::Fragment,
        }
    }

    /// The standard numeric node type.
    pub fn node_type(&self) -> NodeType {
        match &self.data {
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::Comment(_) => NodeType::Comment,
            NodeData::Document => NodeType::Document,
            NodeData::Fragment => NodeType::DocumentFragment,
        }
    }

    /// The DOM node name (`tag` for elements, `#text` and friends otherwise).
    pub fn name(&self) -> &str {
        match &self.data {
            NodeData::Element(element) => &element.name,
            NodeData::Text(_) => "#text",
            NodeData::Comment(_) => "#comment",
            NodeData::Document => "#document",
            NodeData::Fragment => "#document-fragment",
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Whether this node may hold children.
    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(
            self.data,
            NodeData::Element(_) | NodeData::Document | NodeData::Fragment
        )
    }

    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Character data, for text and comment nodes.
    #[inline]
    pub fn character_data(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(text) => Some(&text.content),
            NodeData::Comment(content) => Some(content),
            _ => None,
        }
    }
}

/// Node-specific data.
#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Fragment,
    Element(ElementData),
    Text(TextData),
    Comment(String),
}

/// Element-specific data.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Tag name, stored lowercase.
    pub name: String,
    pub namespace: String,
    pub attrs: Vec<Attribute>,
    pub properties: Vec<Property>,
}

impl ElementData {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            namespace: namespace.to_string(),
            attrs: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Get an attribute value by name, any namespace.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Get an attribute value by namespace and name.
    pub fn get_attr_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name && attr.namespace == namespace)
            .map(|attr| attr.value.as_str())
    }

    /// Set an attribute, returning the previous value if one existed.
    pub fn set_attr(&mut self, namespace: &str, name: &str, value: &str) -> Option<String> {
        for attr in self.attrs.iter_mut() {
            if attr.name == name && attr.namespace == namespace {
                return Some(std::mem::replace(&mut attr.value, value.to_string()));
            }
        }
        self.attrs.push(Attribute {
            name: name.to_string(),
            namespace: namespace.to_string(),
            value: value.to_string(),
        });
        None
    }

    /// Remove an attribute, returning its value if it existed.
    pub fn remove_attr(&mut self, namespace: &str, name: &str) -> Option<String> {
        let position = self
            .attrs
            .iter()
            .position(|attr| attr.name == name && attr.namespace == namespace)?;
        Some(self.attrs.remove(position).value)
    }

    /// Set a property, returning the previous value if one existed.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Option<PropertyValue> {
        for property in self.properties.iter_mut() {
            if property.name == name {
                return Some(std::mem::replace(&mut property.value, value));
            }
        }
        self.properties.push(Property { name: name.to_string(), value });
        None
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .map(|property| &property.value)
    }
}

/// Text node data.
#[derive(Debug, Clone)]
pub struct TextData {
    pub content: String,
}

/// One element attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub namespace: String,
    pub value: String,
}

/// One mirrored element property (`value`, `checked`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

/// Property payloads are either text or boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Flag(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_names() {
        assert_eq!(Node::element("DIV", "ns").name(), "div");
        assert_eq!(Node::text("hi").name(), "#text");
        assert_eq!(Node::comment("c").name(), "#comment");
        assert_eq!(Node::document().name(), "#document");
        assert_eq!(Node::fragment().name(), "#document-fragment");
    }

    #[test]
    fn test_set_attr_returns_old_value() {
        let mut element = ElementData::new("div", "ns");
        assert_eq!(element.set_attr("ns", "class", "a"), None);
        assert_eq!(element.set_attr("ns", "class", "b"), Some("a".to_string()));
        assert_eq!(element.get_attr("class"), Some("b"));
    }

    #[test]
    fn test_attrs_are_namespace_scoped() {
        let mut element = ElementData::new("div", "ns");
        element.set_attr("ns-a", "x", "1");
        element.set_attr("ns-b", "x", "2");
        assert_eq!(element.get_attr_ns("ns-a", "x"), Some("1"));
        assert_eq!(element.get_attr_ns("ns-b", "x"), Some("2"));
        assert_eq!(element.remove_attr("ns-a", "x"), Some("1".to_string()));
        assert_eq!(element.get_attr_ns("ns-a", "x"), None);
        assert_eq!(element.get_attr("x"), Some("2"));
    }

    #[test]
    fn test_remove_absent_attr_is_none() {
        let mut element = ElementData::new("div", "ns");
        assert_eq!(element.remove_attr("ns", "missing"), None);
    }

    #[test]
    fn test_properties() {
        let mut element = ElementData::new("input", "ns");
        assert_eq!(element.set_property("checked", PropertyValue::Flag(true)), None);
        assert_eq!(
            element.set_property("checked", PropertyValue::Flag(false)),
            Some(PropertyValue::Flag(true))
        );
        assert_eq!(element.get_property("checked"), Some(&PropertyValue::Flag(false)));
    }
}
