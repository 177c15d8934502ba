//! Canvas patterns
//!
//! Pattern stand-ins built from an image handle and a repetition mode.

use weft_dom::{Handle, ReferenceTarget};
use weft_wire::{ObjectOp, StringTable};

/// Pattern tiling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repetition {
    #[default]
    Repeat,
    RepeatX,
    RepeatY,
    NoRepeat,
}

impl Repetition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Repeat => "repeat",
            Self::RepeatX => "repeat-x",
            Self::RepeatY => "repeat-y",
            Self::NoRepeat => "no-repeat",
        }
    }
}

/// Local emulation; patterns take no operations after creation.
#[derive(Debug)]
pub struct PatternTarget {
    repetition: Repetition,
}

impl PatternTarget {
    pub fn new(repetition: Repetition) -> Self {
        Self { repetition }
    }

    pub fn repetition(&self) -> Repetition {
        self.repetition
    }
}

impl ReferenceTarget for PatternTarget {
    fn apply(&mut self, _op: &ObjectOp, _strings: &StringTable) {}
}

/// A pattern reference usable as fill or stroke style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasPattern {
    handle: Handle,
}

impl CanvasPattern {
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repetition_wire_names() {
        assert_eq!(Repetition::Repeat.as_str(), "repeat");
        assert_eq!(Repetition::RepeatX.as_str(), "repeat-x");
        assert_eq!(Repetition::RepeatY.as_str(), "repeat-y");
        assert_eq!(Repetition::NoRepeat.as_str(), "no-repeat");
    }
}
