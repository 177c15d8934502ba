//! Identity registry
//!
//! The single document-wide counter behind every handle: mirrored nodes and
//! broker-issued reference objects draw from the same sequence, so a handle
//! names exactly one object on both sides of the channel for the lifetime
//! of the document.

use weft_wire::Handle;

/// Handle of the document node, pre-assigned on both sides of the channel.
pub const DOCUMENT_HANDLE: Handle = Handle::from_raw(1);
/// Handle of the skeleton `<html>` element.
pub const HTML_HANDLE: Handle = Handle::from_raw(2);
/// Handle of the skeleton `<head>` element.
pub const HEAD_HANDLE: Handle = Handle::from_raw(3);
/// Handle of the skeleton `<body>` element.
pub const BODY_HANDLE: Handle = Handle::from_raw(4);

/// Monotonic handle source. Values are never reused; `0` stays reserved
/// wire-wide for "absent".
#[derive(Debug)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    /// Start allocating after the pre-assigned skeleton handles.
    pub fn new() -> Self {
        Self { next: BODY_HANDLE.as_u32() + 1 }
    }

    pub fn allocate(&mut self) -> Handle {
        let handle = Handle::from_raw(self.next);
        self.next += 1;
        handle
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_starts_after_skeleton() {
        let mut allocator = HandleAllocator::new();
        let first = allocator.allocate();
        assert!(first.as_u32() > BODY_HANDLE.as_u32());
    }

    #[test]
    fn test_handles_are_sequential_and_distinct() {
        let mut allocator = HandleAllocator::new();
        let a = allocator.allocate();
        let b = allocator.allocate();
        let c = allocator.allocate();
        assert_eq!(b.as_u32(), a.as_u32() + 1);
        assert_eq!(c.as_u32(), b.as_u32() + 1);
    }
}
