use page_lens::geometry::{
    block_extent, cluster, normalize, BBox, ClusterThresholds, RawWord, ScaleFactors,
};

fn fixture_words() -> Vec<RawWord> {
    let body = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/scan_words.json"
    ));
    serde_json::from_str(body).unwrap()
}

#[test]
fn words_cluster_into_reading_order_blocks() {
    let words = normalize(fixture_words(), 20.0);
    let blocks = cluster(&words, ClusterThresholds::default());

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].text, "Verse koffie");
    assert_eq!(blocks[1].text, "vandaag gebrand");
    assert_eq!(
        blocks[0].bbox,
        BBox {
            x0: 40.0,
            y0: 20.0,
            x1: 180.0,
            y1: 42.0
        }
    );
    insta::assert_json_snapshot!(blocks);
}

#[test]
fn blocks_map_onto_the_rendered_page() {
    let words = normalize(fixture_words(), 20.0);
    let blocks = cluster(&words, ClusterThresholds::default());
    let scale = ScaleFactors::new((800.0, 600.0), block_extent(&blocks), (400.0, 300.0)).unwrap();

    let screen = scale.to_screen(&blocks[0].bbox);
    assert_eq!(
        screen,
        BBox {
            x0: 20.0,
            y0: 10.0,
            x1: 90.0,
            y1: 21.0
        }
    );
    assert_eq!(scale.to_ocr(&screen), blocks[0].bbox);
}
