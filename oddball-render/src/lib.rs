pub mod render;

pub use ab_glyph::FontVec;
pub use render::{FrameStats, SkiaRenderer, load_font, render_text_pixmap};
