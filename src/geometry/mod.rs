mod cluster;
mod map;
mod normalize;

pub use cluster::{cluster, ClusterThresholds};
pub use map::{block_extent, pick_media, selection_text, words_in_rect, MediaRect, ScaleFactors};
pub use normalize::normalize;

use serde::{Deserialize, Serialize};

/// Word entry as the OCR service reports it, in source-image pixel space.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWord {
    pub text: String,
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// Normalized word rectangle with derived edges. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordBox {
    pub text: String,
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
    pub bottom: f64,
    pub right: f64,
}

impl WordBox {
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub bbox: BBox,
}
