//! Protocol constants
//!
//! Opcodes for the change-record stream, DOM node-type values, and the
//! small shared vocabulary for call targets and listener flags.

use crate::Handle;

/// Change-record opcodes. `0` is never a valid opcode so a zeroed slot can
/// always be read as "absent".
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Attributes = 1,
    CharacterData = 2,
    ChildList = 3,
    Properties = 4,
    EventSubscription = 5,
    ObjectCall = 6,
    ObjectCreate = 7,
    ObjectMutation = 8,
    RenderContextRequest = 9,
    ImageHandleRequest = 10,
}

impl Opcode {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Attributes),
            2 => Some(Self::CharacterData),
            3 => Some(Self::ChildList),
            4 => Some(Self::Properties),
            5 => Some(Self::EventSubscription),
            6 => Some(Self::ObjectCall),
            7 => Some(Self::ObjectCreate),
            8 => Some(Self::ObjectMutation),
            9 => Some(Self::RenderContextRequest),
            10 => Some(Self::ImageHandleRequest),
            _ => None,
        }
    }
}

/// DOM node types, carrying the standard numeric values.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    Comment = 8,
    Document = 9,
    DocumentFragment = 11,
}

impl NodeType {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Target of an object-class record: a mirrored node or a broker-issued
/// reference object. The wire carries the discriminant ahead of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallTarget {
    Node(Handle),
    Reference(Handle),
}

impl CallTarget {
    pub const fn kind_word(self) -> u32 {
        match self {
            CallTarget::Node(_) => 1,
            CallTarget::Reference(_) => 2,
        }
    }

    pub const fn handle(self) -> Handle {
        match self {
            CallTarget::Node(handle) | CallTarget::Reference(handle) => handle,
        }
    }
}

/// Listener registration options, shipped as a bitfield in the
/// event-subscription record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerFlags {
    pub capture: bool,
    pub passive: bool,
    pub once: bool,
}

impl ListenerFlags {
    const CAPTURE: u32 = 1;
    const PASSIVE: u32 = 1 << 1;
    const ONCE: u32 = 1 << 2;

    pub fn bits(self) -> u32 {
        let mut bits = 0;
        if self.capture {
            bits |= Self::CAPTURE;
        }
        if self.passive {
            bits |= Self::PASSIVE;
        }
        if self.once {
            bits |= Self::ONCE;
        }
        bits
    }

    pub fn from_bits(bits: u32) -> Self {
        Self {
            capture: bits & Self::CAPTURE != 0,
            passive: bits & Self::PASSIVE != 0,
            once: bits & Self::ONCE != 0,
        }
    }
}
