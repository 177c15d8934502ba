//! Context state emulation
//!
//! Mirrors the drawing state the host context holds, so style reads answer
//! locally. Only state-bearing operations matter here; path and paint
//! calls pass through untouched and take effect host-side.

use weft_dom::{Handle, ReferenceTarget};
use weft_wire::{CallArg, CallTarget, ObjectOp, StringTable};

/// Fill or stroke paint.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintStyle {
    /// CSS color text.
    Color(String),
    /// Gradient or pattern reference.
    Reference(Handle),
}

/// Line cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "butt" => Some(Self::Butt),
            "round" => Some(Self::Round),
            "square" => Some(Self::Square),
            _ => None,
        }
    }
}

/// Line join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "miter" => Some(Self::Miter),
            "round" => Some(Self::Round),
            "bevel" => Some(Self::Bevel),
            _ => None,
        }
    }
}

/// Text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Start,
    End,
    Left,
    Right,
    Center,
}

impl TextAlign {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "center" => Some(Self::Center),
            _ => None,
        }
    }
}

/// Text baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    Top,
    Hanging,
    Middle,
    #[default]
    Alphabetic,
    Ideographic,
    Bottom,
}

impl TextBaseline {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "top" => Some(Self::Top),
            "hanging" => Some(Self::Hanging),
            "middle" => Some(Self::Middle),
            "alphabetic" => Some(Self::Alphabetic),
            "ideographic" => Some(Self::Ideographic),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// One save/restore frame of drawing state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateFrame {
    pub fill_style: PaintStyle,
    pub stroke_style: PaintStyle,
    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    pub line_dash: Vec<f64>,
    pub line_dash_offset: f64,
    pub font: String,
    pub text_align: TextAlign,
    pub text_baseline: TextBaseline,
    pub global_alpha: f64,
    pub shadow_offset_x: f64,
    pub shadow_offset_y: f64,
    pub shadow_blur: f64,
    pub shadow_color: String,
}

impl Default for StateFrame {
    fn default() -> Self {
        Self {
            fill_style: PaintStyle::Color("#000000".to_string()),
            stroke_style: PaintStyle::Color("#000000".to_string()),
            line_width: 1.0,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            miter_limit: 10.0,
            line_dash: Vec::new(),
            line_dash_offset: 0.0,
            font: "10px sans-serif".to_string(),
            text_align: TextAlign::default(),
            text_baseline: TextBaseline::default(),
            global_alpha: 1.0,
            shadow_offset_x: 0.0,
            shadow_offset_y: 0.0,
            shadow_blur: 0.0,
            shadow_color: "rgba(0, 0, 0, 0)".to_string(),
        }
    }
}

/// Save/restore stack fed by the context's operation stream.
#[derive(Debug)]
pub struct ContextState {
    frames: Vec<StateFrame>,
}

impl Default for ContextState {
    fn default() -> Self {
        Self { frames: vec![StateFrame::default()] }
    }
}

impl ContextState {
    /// Current drawing state.
    pub fn current(&self) -> &StateFrame {
        // The stack is never empty; restore refuses to pop the last frame.
        &self.frames[self.frames.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn current_mut(&mut self) -> &mut StateFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn save(&mut self) {
        let snapshot = self.current().clone();
        self.frames.push(snapshot);
    }

    fn restore(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    fn set_paint(&mut self, stroke: bool, value: &CallArg, strings: &StringTable) {
        let paint = match value {
            CallArg::Str(id) => PaintStyle::Color(strings.resolve(*id).to_string()),
            CallArg::Ref(CallTarget::Reference(handle)) => PaintStyle::Reference(*handle),
            _ => return,
        };
        if stroke {
            self.current_mut().stroke_style = paint;
        } else {
            self.current_mut().fill_style = paint;
        }
    }
}

fn float_value(value: &CallArg) -> Option<f64> {
    match value {
        CallArg::Float(v) => Some(*v),
        CallArg::Int(v) => Some(f64::from(*v)),
        _ => None,
    }
}

fn str_value<'a>(value: &CallArg, strings: &'a StringTable) -> Option<&'a str> {
    match value {
        CallArg::Str(id) => Some(strings.resolve(*id)),
        _ => None,
    }
}

impl ReferenceTarget for ContextState {
    fn apply(&mut self, op: &ObjectOp, strings: &StringTable) {
        match op {
            ObjectOp::Set { name, value } => match strings.resolve(*name) {
                "fillStyle" => self.set_paint(false, value, strings),
                "strokeStyle" => self.set_paint(true, value, strings),
                "lineWidth" => {
                    if let Some(v) = float_value(value) {
                        self.current_mut().line_width = v;
                    }
                }
                "lineCap" => {
                    if let Some(cap) = str_value(value, strings).and_then(LineCap::parse) {
                        self.current_mut().line_cap = cap;
                    }
                }
                "lineJoin" => {
                    if let Some(join) = str_value(value, strings).and_then(LineJoin::parse) {
                        self.current_mut().line_join = join;
                    }
                }
                "miterLimit" => {
                    if let Some(v) = float_value(value) {
                        self.current_mut().miter_limit = v;
                    }
                }
                "lineDashOffset" => {
                    if let Some(v) = float_value(value) {
                        self.current_mut().line_dash_offset = v;
                    }
                }
                "font" => {
                    if let Some(font) = str_value(value, strings) {
                        self.current_mut().font = font.to_string();
                    }
                }
                "textAlign" => {
                    if let Some(align) = str_value(value, strings).and_then(TextAlign::parse) {
                        self.current_mut().text_align = align;
                    }
                }
                "textBaseline" => {
                    if let Some(baseline) = str_value(value, strings).and_then(TextBaseline::parse)
                    {
                        self.current_mut().text_baseline = baseline;
                    }
                }
                "globalAlpha" => {
                    if let Some(v) = float_value(value) {
                        if (0.0..=1.0).contains(&v) {
                            self.current_mut().global_alpha = v;
                        }
                    }
                }
                "shadowOffsetX" => {
                    if let Some(v) = float_value(value) {
                        self.current_mut().shadow_offset_x = v;
                    }
                }
                "shadowOffsetY" => {
                    if let Some(v) = float_value(value) {
                        self.current_mut().shadow_offset_y = v;
                    }
                }
                "shadowBlur" => {
                    if let Some(v) = float_value(value) {
                        self.current_mut().shadow_blur = v;
                    }
                }
                "shadowColor" => {
                    if let Some(color) = str_value(value, strings) {
                        self.current_mut().shadow_color = color.to_string();
                    }
                }
                other => tracing::trace!(property = other, "untracked context property"),
            },
            ObjectOp::Call(call) => match strings.resolve(call.fn_name) {
                "save" => self.save(),
                "restore" => self.restore(),
                "setLineDash" => {
                    if let Some(CallArg::FloatList(dash)) = call.args.first() {
                        self.current_mut().line_dash = dash.clone();
                    }
                }
                // Path and paint calls change pixels, not state.
                _ => {}
            },
        }
    }
}
