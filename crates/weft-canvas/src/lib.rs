//! Weft Canvas - worker-side canvas 2D proxy
//!
//! Drawing API that forwards to a host-rendered context through the
//! document's reference layer, with drawing state mirrored locally.

mod context;
mod error;
mod gradient;
mod image;
mod pattern;
mod state;

pub use context::RenderContext2d;
pub use error::CanvasError;
pub use gradient::{CanvasGradient, ColorStop, GradientTarget};
pub use image::{ImageBitmap, ImageBitmapTarget};
pub use pattern::{CanvasPattern, PatternTarget, Repetition};
pub use state::{ContextState, LineCap, LineJoin, PaintStyle, StateFrame, TextAlign, TextBaseline};
