//! DOM operation errors

use weft_wire::Handle;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors. Misuse that browsers treat permissively (removing
/// an absent attribute, double-removing a listener) does not error; only
/// structural misuse reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node {0:?} not found in this document")]
    NotFound(Handle),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(&'static str),

    #[error("Operation not valid for this node type")]
    InvalidNodeType,

    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: Handle, child: Handle },
}
