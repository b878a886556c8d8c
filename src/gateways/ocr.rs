use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::GatewayError;
use crate::geometry::RawWord;
use crate::media::MediaFrame;
use crate::settings::Settings;

/// Client for the ocr.space word-overlay endpoint.
#[derive(Debug, Clone)]
pub struct OcrGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    language: String,
    engine: u8,
}

impl OcrGateway {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            endpoint: settings.scan_endpoint.clone(),
            api_key: settings.scan_api_key.clone(),
            language: settings.scan_language.clone(),
            engine: settings.scan_engine,
        }
    }

    /// Sends the frame and returns the recognized words in OCR pixel space.
    /// An overlay without words is a success with an empty list.
    pub async fn scan(&self, frame: &MediaFrame) -> Result<Vec<RawWord>, GatewayError> {
        let payload = format!("data:{};base64,{}", frame.mime, BASE64.encode(&frame.bytes));
        let engine = self.engine.to_string();
        let form = [
            ("base64Image", payload.as_str()),
            ("language", self.language.as_str()),
            ("isOverlayRequired", "true"),
            ("apikey", self.api_key.as_str()),
            ("OCREngine", engine.as_str()),
        ];
        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(format!("ocr request failed: {}", err)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GatewayError::Transport(format!("ocr response unreadable: {}", err)))?;
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "ocr service error ({})",
                status
            )));
        }
        let words = parse_scan_response(&body)?;
        debug!("ocr returned {} words", words.len());
        Ok(words)
    }
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "TextOverlay")]
    text_overlay: Option<TextOverlay>,
}

#[derive(Debug, Deserialize)]
struct TextOverlay {
    #[serde(rename = "Lines", default)]
    lines: Vec<OverlayLine>,
}

#[derive(Debug, Deserialize)]
struct OverlayLine {
    #[serde(rename = "Words", default)]
    words: Vec<OverlayWord>,
}

#[derive(Debug, Deserialize)]
struct OverlayWord {
    #[serde(rename = "WordText")]
    word_text: String,
    #[serde(rename = "Top")]
    top: f64,
    #[serde(rename = "Left")]
    left: f64,
    #[serde(rename = "Width")]
    width: f64,
    #[serde(rename = "Height")]
    height: f64,
}

fn parse_scan_response(body: &str) -> Result<Vec<RawWord>, GatewayError> {
    let payload: OcrResponse = serde_json::from_str(body)
        .map_err(|err| GatewayError::Transport(format!("failed to parse ocr response: {}", err)))?;

    let messages = error_messages(payload.error_message.as_ref());
    if messages.iter().any(|message| message.contains("E101")) {
        return Err(GatewayError::RateLimited(
            "Server Timeout (E101). Try again.".to_string(),
        ));
    }
    let Some(first) = payload.parsed_results.first() else {
        let message = messages
            .into_iter()
            .next()
            .unwrap_or_else(|| "No text found.".to_string());
        return Err(GatewayError::EmptyResult(message));
    };

    let words = first
        .text_overlay
        .as_ref()
        .map(|overlay| {
            overlay
                .lines
                .iter()
                .flat_map(|line| line.words.iter())
                .map(|word| RawWord {
                    text: word.word_text.clone(),
                    top: word.top,
                    left: word.left,
                    width: word.width,
                    height: word.height,
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(words)
}

// ocr.space reports ErrorMessage either as a string or as a list of strings.
fn error_messages(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(message)) => vec![message.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(|message| message.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}
