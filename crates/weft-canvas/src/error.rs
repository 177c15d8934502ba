//! Canvas errors

use weft_dom::DomError;

/// Failures raised before anything crosses the channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanvasError {
    #[error("Unsupported rendering context kind {0:?}")]
    UnsupportedKind(String),
    #[error(transparent)]
    Dom(#[from] DomError),
}
