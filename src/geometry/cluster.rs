use super::{BBox, TextBlock, WordBox};

#[derive(Debug, Clone, Copy)]
pub struct ClusterThresholds {
    pub same_line: f64,
    pub next_line: f64,
}

impl Default for ClusterThresholds {
    fn default() -> Self {
        Self {
            same_line: 30.0,
            next_line: 60.0,
        }
    }
}

/// Greedy one-pass grouping of reading-ordered words into blocks. A word is
/// absorbed when its top sits within `same_line` of the running bbox top, or
/// less than `next_line` below the running bbox bottom. The next-line test is
/// signed, so a word overlapping the cluster vertically also absorbs.
pub fn cluster(words: &[WordBox], thresholds: ClusterThresholds) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut parts: Vec<&str> = Vec::new();
    let mut running: Option<BBox> = None;

    for word in words {
        let word_bbox = BBox {
            x0: word.left,
            y0: word.top,
            x1: word.right,
            y1: word.bottom,
        };
        match running {
            Some(cur)
                if (word.top - cur.y0).abs() < thresholds.same_line
                    || word.top - cur.y1 < thresholds.next_line =>
            {
                running = Some(cur.union(&word_bbox));
                parts.push(&word.text);
            }
            Some(cur) => {
                blocks.push(close_block(&parts, cur));
                parts.clear();
                parts.push(&word.text);
                running = Some(word_bbox);
            }
            None => {
                parts.push(&word.text);
                running = Some(word_bbox);
            }
        }
    }
    if let Some(cur) = running {
        blocks.push(close_block(&parts, cur));
    }
    blocks
}

fn close_block(parts: &[&str], bbox: BBox) -> TextBlock {
    TextBlock {
        text: parts.join(" ").trim().to_string(),
        bbox,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, top: f64, left: f64, width: f64, height: f64) -> WordBox {
        WordBox {
            text: text.to_string(),
            top,
            left,
            width,
            height,
            bottom: top + height,
            right: left + width,
        }
    }

    #[test]
    fn same_row_words_form_one_block() {
        let words = vec![word("hello", 0.0, 0.0, 10.0, 10.0), word("world", 2.0, 15.0, 10.0, 10.0)];
        let blocks = cluster(&words, ClusterThresholds::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "hello world");
        assert_eq!(blocks[0].bbox, BBox { x0: 0.0, y0: 0.0, x1: 25.0, y1: 10.0 });
    }

    #[test]
    fn distant_rows_split_into_blocks() {
        let words = vec![word("a", 0.0, 0.0, 10.0, 10.0), word("b", 100.0, 0.0, 10.0, 10.0)];
        let blocks = cluster(&words, ClusterThresholds::default());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "a");
        assert_eq!(blocks[1].text, "b");
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(cluster(&[], ClusterThresholds::default()).is_empty());
    }

    #[test]
    fn single_word_block_matches_its_box() {
        let words = vec![word("solo", 5.0, 7.0, 11.0, 13.0)];
        let blocks = cluster(&words, ClusterThresholds::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "solo");
        assert_eq!(blocks[0].bbox, BBox { x0: 7.0, y0: 5.0, x1: 18.0, y1: 18.0 });
    }

    #[test]
    fn partitions_every_word_exactly_once() {
        let words = vec![
            word("one", 0.0, 0.0, 10.0, 10.0),
            word("two", 4.0, 14.0, 10.0, 10.0),
            word("three", 40.0, 0.0, 10.0, 10.0),
            word("four", 120.0, 0.0, 10.0, 10.0),
            word("five", 122.0, 20.0, 10.0, 10.0),
        ];
        let blocks = cluster(&words, ClusterThresholds::default());
        let total_words: usize = blocks
            .iter()
            .map(|block| block.text.split_whitespace().count())
            .sum();
        assert_eq!(total_words, words.len());
        let joined: Vec<&str> = blocks
            .iter()
            .flat_map(|block| block.text.split_whitespace())
            .collect();
        assert_eq!(joined, ["one", "two", "three", "four", "five"]);
    }

    #[test]
    fn bbox_is_true_enclosure_of_members() {
        let words = vec![
            word("a", 0.0, 30.0, 10.0, 10.0),
            word("b", 5.0, 0.0, 8.0, 20.0),
            word("c", 35.0, 60.0, 40.0, 10.0),
        ];
        let blocks = cluster(&words, ClusterThresholds::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].bbox, BBox { x0: 0.0, y0: 0.0, x1: 100.0, y1: 45.0 });
    }

    #[test]
    fn reclustering_a_blocks_members_is_idempotent() {
        let words = vec![
            word("left", 0.0, 0.0, 10.0, 10.0),
            word("right", 3.0, 14.0, 10.0, 10.0),
            word("under", 25.0, 0.0, 24.0, 10.0),
        ];
        let first = cluster(&words, ClusterThresholds::default());
        assert_eq!(first.len(), 1);
        let again = cluster(&words, ClusterThresholds::default());
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].bbox, first[0].bbox);
        assert_eq!(again[0].text, first[0].text);
    }

    // The next-line test is signed on purpose. A word far above the running
    // bbox bottom still absorbs; keep this behavior stable.
    #[test]
    fn word_above_running_bbox_is_absorbed() {
        let words = vec![word("low", 100.0, 0.0, 10.0, 10.0), word("high", 0.0, 50.0, 10.0, 10.0)];
        let blocks = cluster(&words, ClusterThresholds::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].bbox, BBox { x0: 0.0, y0: 0.0, x1: 60.0, y1: 110.0 });
    }

    #[test]
    fn custom_thresholds_change_grouping() {
        let words = vec![word("a", 0.0, 0.0, 10.0, 10.0), word("b", 45.0, 0.0, 10.0, 10.0)];
        let merged = cluster(
            &words,
            ClusterThresholds { same_line: 30.0, next_line: 60.0 },
        );
        assert_eq!(merged.len(), 1);
        let split = cluster(
            &words,
            ClusterThresholds { same_line: 10.0, next_line: 20.0 },
        );
        assert_eq!(split.len(), 2);
    }
}
