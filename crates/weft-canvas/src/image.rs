//! Image handles
//!
//! Worker-side stand-ins for decoded images. The request names a source
//! node; the host decodes its current contents out of band and resolves
//! the handle with the final dimensions.

use weft_dom::{Document, DomResult, Handle, ReferenceTarget};
use weft_wire::{ObjectOp, StringTable};

/// Resolved image counterpart carrying the decoded size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBitmapTarget {
    pub width: u32,
    pub height: u32,
}

impl ImageBitmapTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ReferenceTarget for ImageBitmapTarget {
    fn apply(&mut self, _op: &ObjectOp, _strings: &StringTable) {}
}

/// A decoded-image reference, drawable once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBitmap {
    handle: Handle,
}

impl ImageBitmap {
    /// Request decoding of a source node's current contents.
    pub fn request(document: &mut Document, source: Handle) -> DomResult<Self> {
        let handle = document.request_image_handle(source)?;
        Ok(Self { handle })
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Decoded dimensions, known once the host replies.
    pub fn size(&self, document: &Document) -> Option<(u32, u32)> {
        document
            .broker()
            .resolved::<ImageBitmapTarget>(self.handle)
            .map(|target| (target.width, target.height))
    }

    pub fn is_ready(&self, document: &Document) -> bool {
        document.broker().is_resolved(self.handle)
    }
}
