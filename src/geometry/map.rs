use std::cmp::Ordering;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use super::{BBox, TextBlock, WordBox};

/// Independent horizontal/vertical factors between OCR pixel space and the
/// rendered on-screen rectangle. Never collapsed to a uniform scale.
#[derive(Debug, Clone, Copy)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    /// The denominator is the larger of the native media size and the OCR
    /// coordinate extent, which guards against word boxes that run past the
    /// declared media dimensions.
    pub fn new(native: (f64, f64), extent: (f64, f64), rendered: (f64, f64)) -> Result<Self> {
        let canvas_w = native.0.max(extent.0);
        let canvas_h = native.1.max(extent.1);
        if canvas_w <= 0.0 || canvas_h <= 0.0 {
            return Err(anyhow!("media and text extent are both zero-size"));
        }
        if rendered.0 <= 0.0 || rendered.1 <= 0.0 {
            return Err(anyhow!("rendered rect is zero-size"));
        }
        Ok(Self {
            x: rendered.0 / canvas_w,
            y: rendered.1 / canvas_h,
        })
    }

    pub fn to_screen(&self, bbox: &BBox) -> BBox {
        BBox {
            x0: bbox.x0 * self.x,
            y0: bbox.y0 * self.y,
            x1: bbox.x1 * self.x,
            y1: bbox.y1 * self.y,
        }
    }

    pub fn to_ocr(&self, rect: &BBox) -> BBox {
        BBox {
            x0: rect.x0 / self.x,
            y0: rect.y0 / self.y,
            x1: rect.x1 / self.x,
            y1: rect.y1 / self.y,
        }
    }
}

/// Max x1/y1 over all block bboxes, in OCR pixel space.
pub fn block_extent(blocks: &[TextBlock]) -> (f64, f64) {
    blocks.iter().fold((0.0_f64, 0.0_f64), |(x, y), block| {
        (x.max(block.bbox.x1), y.max(block.bbox.y1))
    })
}

/// Words whose center point lies inside the rectangle, in input order.
pub fn words_in_rect<'a>(words: &'a [WordBox], rect: &BBox) -> Vec<&'a WordBox> {
    words
        .iter()
        .filter(|word| {
            let (cx, cy) = word.center();
            rect.contains(cx, cy)
        })
        .collect()
}

/// Recovers the text covered by a screen-edited rectangle already mapped
/// back to OCR space. Selection, not re-clustering.
pub fn selection_text(words: &[WordBox], rect: &BBox) -> String {
    words_in_rect(words, rect)
        .iter()
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

const MIN_MEDIA_DIM: f64 = 150.0;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MediaRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl MediaRect {
    fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Index of the candidate whose center is nearest the click point.
/// Candidates narrower or shorter than 150 px are skipped.
pub fn pick_media(click: (f64, f64), candidates: &[MediaRect]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, rect)| rect.width >= MIN_MEDIA_DIM && rect.height >= MIN_MEDIA_DIM)
        .min_by(|(_, a), (_, b)| {
            dist_sq(click, a.center())
                .partial_cmp(&dist_sq(click, b.center()))
                .unwrap_or(Ordering::Equal)
        })
        .map(|(index, _)| index)
}

fn dist_sq(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}
