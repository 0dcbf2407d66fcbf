use serde::{Deserialize, Serialize};

/// Straight RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    /// Mid grey, the neutral background between flash and trials.
    pub const GREY: Color = Color([128, 128, 128, 255]);

    pub fn rgba(&self) -> [u8; 4] {
        self.0
    }
}

/// What a single committed frame shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Stimulus {
    Blank {
        color: Color,
    },
    FixationCross {
        orientation_deg: f32,
        size: f32,
        color: Color,
        background: Color,
    },
    Text {
        content: String,
        size: f32,
        color: Color,
        background: Color,
    },
}

impl Stimulus {
    pub fn blank(color: Color) -> Self {
        Stimulus::Blank { color }
    }

    /// White cross on the neutral background, 50 px like the scanner-room setup.
    pub fn cross(orientation_deg: f32) -> Self {
        Stimulus::FixationCross {
            orientation_deg,
            size: 50.0,
            color: Color::WHITE,
            background: Color::GREY,
        }
    }

    pub fn message(content: impl Into<String>) -> Self {
        Stimulus::Text {
            content: content.into(),
            size: 30.0,
            color: Color::WHITE,
            background: Color::GREY,
        }
    }

    pub fn background(&self) -> Color {
        match self {
            Stimulus::Blank { color } => *color,
            Stimulus::FixationCross { background, .. } | Stimulus::Text { background, .. } => {
                *background
            }
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Stimulus::Text { .. })
    }
}
