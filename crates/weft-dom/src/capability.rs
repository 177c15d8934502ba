//! Element capabilities
//!
//! Behavior lookup by tag name. Element catalogues that need richer
//! per-element behavior compose on top of this seam; the mirrored tree
//! itself stays a single element type.

/// Per-tag behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementCapabilities {
    /// Participates in form submission and owns a `form` relation.
    pub form_associated: bool,
    /// Can be the target of a `<label>`.
    pub labelable: bool,
    /// Never holds children in serialized form.
    pub void_element: bool,
}

/// Capabilities for a lowercase tag name.
pub fn capabilities_for(tag: &str) -> ElementCapabilities {
    match tag {
        "input" => ElementCapabilities {
            form_associated: true,
            labelable: true,
            void_element: true,
        },
        "button" | "select" | "textarea" => ElementCapabilities {
            form_associated: true,
            labelable: true,
            void_element: false,
        },
        "fieldset" | "object" | "output" => ElementCapabilities {
            form_associated: true,
            labelable: tag == "output",
            void_element: false,
        },
        "meter" | "progress" => ElementCapabilities {
            form_associated: false,
            labelable: true,
            void_element: false,
        },
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "link" | "meta"
        | "source" | "track" | "wbr" => ElementCapabilities {
            form_associated: false,
            labelable: false,
            void_element: true,
        },
        _ => ElementCapabilities::default(),
    }
}
