use serde::{Deserialize, Serialize};

use crate::geometry::{BBox, WordBox};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ScanRequest {
    pub(crate) url: Option<String>,
    pub(crate) data_base64: Option<String>,
    pub(crate) page_url: Option<String>,
    pub(crate) rendered_w: Option<f64>,
    pub(crate) rendered_h: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScanResponse {
    pub(crate) session_id: String,
    pub(crate) words: Vec<WordBox>,
    pub(crate) blocks: Vec<BlockPayload>,
}

/// A clustered block with its box in both coordinate spaces, so the content
/// script can draw without repeating the scale math.
#[derive(Debug, Serialize)]
pub(crate) struct BlockPayload {
    pub(crate) text: String,
    pub(crate) bbox: BBox,
    pub(crate) screen_bbox: BBox,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionRequest {
    pub(crate) session_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReselectRequest {
    pub(crate) session_id: String,
    pub(crate) rect: BBox,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextResponse {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PhaseResponse {
    pub(crate) phase: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranslateRequest {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TranslationResponse {
    pub(crate) translation: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpeakRequest {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpeakResponse {
    pub(crate) audio: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NavigateRequest {
    pub(crate) page_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NavigateResponse {
    pub(crate) invalidated: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NotebookAddRequest {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NotebookResponse {
    pub(crate) lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
