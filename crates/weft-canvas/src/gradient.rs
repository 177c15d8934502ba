//! Canvas gradients
//!
//! Gradient stand-ins created through a context. Color stops queue like
//! any reference operation and replay host-side once the gradient
//! materializes.

use weft_dom::{CallValue, Document, Handle, ReferenceTarget};
use weft_wire::{CallArg, ObjectOp, StringTable};

/// One gradient color stop.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorStop {
    pub offset: f64,
    pub color: String,
}

/// Local emulation tracking the stops added so far.
#[derive(Debug, Default)]
pub struct GradientTarget {
    stops: Vec<ColorStop>,
}

impl GradientTarget {
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }
}

impl ReferenceTarget for GradientTarget {
    fn apply(&mut self, op: &ObjectOp, strings: &StringTable) {
        let ObjectOp::Call(call) = op else { return };
        if strings.resolve(call.fn_name) != "addColorStop" {
            return;
        }
        let offset = match call.args.first() {
            Some(CallArg::Float(value)) => *value,
            _ => return,
        };
        let color = match call.args.get(1) {
            Some(CallArg::Str(id)) => strings.resolve(*id).to_string(),
            _ => return,
        };
        self.stops.push(ColorStop { offset, color });
    }
}

/// A gradient reference usable as fill or stroke style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasGradient {
    handle: Handle,
}

impl CanvasGradient {
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Add a color stop at `offset` in `[0, 1]`.
    pub fn add_color_stop(&self, document: &mut Document, offset: f64, color: &str) {
        document.call_reference(
            self.handle,
            "addColorStop",
            vec![CallValue::Float(offset), CallValue::Str(color.to_string())],
        );
    }

    /// The locally mirrored stop list.
    pub fn stops<'a>(&self, document: &'a Document) -> &'a [ColorStop] {
        document
            .broker()
            .emulation::<GradientTarget>(self.handle)
            .map(GradientTarget::stops)
            .unwrap_or(&[])
    }
}
