use std::cmp::Ordering;

use super::{RawWord, WordBox};

/// Derives bottom/right edges and sorts into tolerant row-major reading
/// order. Words whose tops differ by less than `row_band` pixels count as
/// the same visual row and order by left edge; otherwise by top edge.
pub fn normalize(raw: Vec<RawWord>, row_band: f64) -> Vec<WordBox> {
    let mut words: Vec<WordBox> = raw
        .into_iter()
        .map(|word| WordBox {
            bottom: word.top + word.height,
            right: word.left + word.width,
            text: word.text,
            top: word.top,
            left: word.left,
            width: word.width,
            height: word.height,
        })
        .collect();

    words.sort_by(|a, b| {
        if (a.top - b.top).abs() < row_band {
            a.left.partial_cmp(&b.left).unwrap_or(Ordering::Equal)
        } else {
            a.top.partial_cmp(&b.top).unwrap_or(Ordering::Equal)
        }
    });
    words
}
