//! Canvas 2D rendering context proxy
//!
//! The worker-facing context. Every method forwards through the document's
//! reference layer; the host performs the actual rasterization when the
//! batched operations arrive. Requesting an unsupported kind fails locally,
//! synchronously, without crossing the channel.

use weft_dom::{CallTarget, CallValue, Document, Handle, ReferenceKind};

use crate::error::CanvasError;
use crate::gradient::{CanvasGradient, GradientTarget};
use crate::image::ImageBitmap;
use crate::pattern::{CanvasPattern, PatternTarget, Repetition};
use crate::state::ContextState;

/// A 2D drawing context bound to a canvas element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext2d {
    handle: Handle,
    canvas: Handle,
}

impl RenderContext2d {
    /// Request a context of the given kind for a canvas element. Only
    /// `"2d"` is drawable here; anything else is refused before any
    /// request is batched.
    pub fn request(
        document: &mut Document,
        canvas: Handle,
        kind: &str,
    ) -> Result<Self, CanvasError> {
        if kind != "2d" {
            return Err(CanvasError::UnsupportedKind(kind.to_string()));
        }
        let handle =
            document.request_render_context(canvas, kind, Some(Box::new(ContextState::default())))?;
        Ok(Self { handle, canvas })
    }

    /// The context's reference handle.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The canvas element this context draws into.
    pub fn canvas(&self) -> Handle {
        self.canvas
    }

    /// The locally mirrored drawing state.
    pub fn state<'a>(&self, document: &'a Document) -> Option<&'a ContextState> {
        document.broker().emulation::<ContextState>(self.handle)
    }

    fn call(&self, document: &mut Document, name: &str, args: Vec<CallValue>) {
        document.call_reference(self.handle, name, args);
    }

    fn set(&self, document: &mut Document, name: &str, value: CallValue) {
        document.set_reference_property(self.handle, name, value);
    }

    // ==================== Rectangles ====================

    pub fn fill_rect(&self, document: &mut Document, x: f64, y: f64, width: f64, height: f64) {
        self.call(document, "fillRect", float_args(&[x, y, width, height]));
    }

    pub fn stroke_rect(&self, document: &mut Document, x: f64, y: f64, width: f64, height: f64) {
        self.call(document, "strokeRect", float_args(&[x, y, width, height]));
    }

    pub fn clear_rect(&self, document: &mut Document, x: f64, y: f64, width: f64, height: f64) {
        self.call(document, "clearRect", float_args(&[x, y, width, height]));
    }

    // ==================== Paths ====================

    pub fn begin_path(&self, document: &mut Document) {
        self.call(document, "beginPath", Vec::new());
    }

    pub fn close_path(&self, document: &mut Document) {
        self.call(document, "closePath", Vec::new());
    }

    pub fn move_to(&self, document: &mut Document, x: f64, y: f64) {
        self.call(document, "moveTo", float_args(&[x, y]));
    }

    pub fn line_to(&self, document: &mut Document, x: f64, y: f64) {
        self.call(document, "lineTo", float_args(&[x, y]));
    }

    pub fn bezier_curve_to(
        &self,
        document: &mut Document,
        cp1x: f64,
        cp1y: f64,
        cp2x: f64,
        cp2y: f64,
        x: f64,
        y: f64,
    ) {
        self.call(document, "bezierCurveTo", float_args(&[cp1x, cp1y, cp2x, cp2y, x, y]));
    }

    pub fn quadratic_curve_to(&self, document: &mut Document, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.call(document, "quadraticCurveTo", float_args(&[cpx, cpy, x, y]));
    }

    pub fn arc(
        &self,
        document: &mut Document,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        counterclockwise: bool,
    ) {
        let mut args = float_args(&[x, y, radius, start_angle, end_angle]);
        args.push(CallValue::Bool(counterclockwise));
        self.call(document, "arc", args);
    }

    pub fn rect(&self, document: &mut Document, x: f64, y: f64, width: f64, height: f64) {
        self.call(document, "rect", float_args(&[x, y, width, height]));
    }

    pub fn fill(&self, document: &mut Document) {
        self.call(document, "fill", Vec::new());
    }

    pub fn stroke(&self, document: &mut Document) {
        self.call(document, "stroke", Vec::new());
    }

    pub fn clip(&self, document: &mut Document) {
        self.call(document, "clip", Vec::new());
    }

    // ==================== State and transforms ====================

    pub fn save(&self, document: &mut Document) {
        self.call(document, "save", Vec::new());
    }

    pub fn restore(&self, document: &mut Document) {
        self.call(document, "restore", Vec::new());
    }

    pub fn translate(&self, document: &mut Document, x: f64, y: f64) {
        self.call(document, "translate", float_args(&[x, y]));
    }

    pub fn rotate(&self, document: &mut Document, angle: f64) {
        self.call(document, "rotate", float_args(&[angle]));
    }

    pub fn scale(&self, document: &mut Document, x: f64, y: f64) {
        self.call(document, "scale", float_args(&[x, y]));
    }

    pub fn set_transform(
        &self,
        document: &mut Document,
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        f: f64,
    ) {
        self.call(document, "setTransform", float_args(&[a, b, c, d, e, f]));
    }

    pub fn set_line_dash(&self, document: &mut Document, segments: Vec<f64>) {
        self.call(document, "setLineDash", vec![CallValue::FloatList(segments)]);
    }

    // ==================== Text ====================

    pub fn fill_text(&self, document: &mut Document, text: &str, x: f64, y: f64) {
        self.call(
            document,
            "fillText",
            vec![CallValue::Str(text.to_string()), CallValue::Float(x), CallValue::Float(y)],
        );
    }

    pub fn stroke_text(&self, document: &mut Document, text: &str, x: f64, y: f64) {
        self.call(
            document,
            "strokeText",
            vec![CallValue::Str(text.to_string()), CallValue::Float(x), CallValue::Float(y)],
        );
    }

    // ==================== Images ====================

    pub fn draw_image(&self, document: &mut Document, image: &ImageBitmap, dx: f64, dy: f64) {
        self.call(
            document,
            "drawImage",
            vec![
                CallValue::Reference(image.handle()),
                CallValue::Float(dx),
                CallValue::Float(dy),
            ],
        );
    }

    pub fn draw_image_scaled(
        &self,
        document: &mut Document,
        image: &ImageBitmap,
        dx: f64,
        dy: f64,
        width: f64,
        height: f64,
    ) {
        self.call(
            document,
            "drawImage",
            vec![
                CallValue::Reference(image.handle()),
                CallValue::Float(dx),
                CallValue::Float(dy),
                CallValue::Float(width),
                CallValue::Float(height),
            ],
        );
    }

    // ==================== Style properties ====================

    pub fn set_fill_style(&self, document: &mut Document, color: &str) {
        self.set(document, "fillStyle", CallValue::Str(color.to_string()));
    }

    pub fn set_fill_gradient(&self, document: &mut Document, gradient: &CanvasGradient) {
        self.set(document, "fillStyle", CallValue::Reference(gradient.handle()));
    }

    pub fn set_fill_pattern(&self, document: &mut Document, pattern: &CanvasPattern) {
        self.set(document, "fillStyle", CallValue::Reference(pattern.handle()));
    }

    pub fn set_stroke_style(&self, document: &mut Document, color: &str) {
        self.set(document, "strokeStyle", CallValue::Str(color.to_string()));
    }

    pub fn set_stroke_gradient(&self, document: &mut Document, gradient: &CanvasGradient) {
        self.set(document, "strokeStyle", CallValue::Reference(gradient.handle()));
    }

    pub fn set_line_width(&self, document: &mut Document, width: f64) {
        self.set(document, "lineWidth", CallValue::Float(width));
    }

    pub fn set_line_cap(&self, document: &mut Document, cap: &str) {
        self.set(document, "lineCap", CallValue::Str(cap.to_string()));
    }

    pub fn set_line_join(&self, document: &mut Document, join: &str) {
        self.set(document, "lineJoin", CallValue::Str(join.to_string()));
    }

    pub fn set_miter_limit(&self, document: &mut Document, limit: f64) {
        self.set(document, "miterLimit", CallValue::Float(limit));
    }

    pub fn set_global_alpha(&self, document: &mut Document, alpha: f64) {
        self.set(document, "globalAlpha", CallValue::Float(alpha));
    }

    pub fn set_font(&self, document: &mut Document, font: &str) {
        self.set(document, "font", CallValue::Str(font.to_string()));
    }

    pub fn set_text_align(&self, document: &mut Document, align: &str) {
        self.set(document, "textAlign", CallValue::Str(align.to_string()));
    }

    pub fn set_text_baseline(&self, document: &mut Document, baseline: &str) {
        self.set(document, "textBaseline", CallValue::Str(baseline.to_string()));
    }

    pub fn set_shadow_blur(&self, document: &mut Document, blur: f64) {
        self.set(document, "shadowBlur", CallValue::Float(blur));
    }

    pub fn set_shadow_color(&self, document: &mut Document, color: &str) {
        self.set(document, "shadowColor", CallValue::Str(color.to_string()));
    }

    pub fn set_shadow_offset(&self, document: &mut Document, x: f64, y: f64) {
        self.set(document, "shadowOffsetX", CallValue::Float(x));
        self.set(document, "shadowOffsetY", CallValue::Float(y));
    }

    // ==================== Paint sources ====================

    /// Request a linear gradient owned by this context.
    pub fn create_linear_gradient(
        &self,
        document: &mut Document,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
    ) -> CanvasGradient {
        let handle = document.request_reference(
            CallTarget::Reference(self.handle),
            "createLinearGradient",
            float_args(&[x0, y0, x1, y1]),
            ReferenceKind::Gradient,
            Some(Box::new(GradientTarget::default())),
        );
        CanvasGradient::from_handle(handle)
    }

    /// Request a radial gradient owned by this context.
    pub fn create_radial_gradient(
        &self,
        document: &mut Document,
        x0: f64,
        y0: f64,
        r0: f64,
        x1: f64,
        y1: f64,
        r1: f64,
    ) -> CanvasGradient {
        let handle = document.request_reference(
            CallTarget::Reference(self.handle),
            "createRadialGradient",
            float_args(&[x0, y0, r0, x1, y1, r1]),
            ReferenceKind::Gradient,
            Some(Box::new(GradientTarget::default())),
        );
        CanvasGradient::from_handle(handle)
    }

    /// Request a pattern from an image handle.
    pub fn create_pattern(
        &self,
        document: &mut Document,
        image: &ImageBitmap,
        repetition: Repetition,
    ) -> CanvasPattern {
        let handle = document.request_reference(
            CallTarget::Reference(self.handle),
            "createPattern",
            vec![
                CallValue::Reference(image.handle()),
                CallValue::Str(repetition.as_str().to_string()),
            ],
            ReferenceKind::Pattern,
            Some(Box::new(PatternTarget::new(repetition))),
        );
        CanvasPattern::from_handle(handle)
    }
}

fn float_args(values: &[f64]) -> Vec<CallValue> {
    values.iter().map(|&value| CallValue::Float(value)).collect()
}
