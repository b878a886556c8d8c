use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::GatewayError;
use crate::settings::Settings;

/// Client for the Google Cloud text-to-speech endpoint. Returns decoded MP3
/// bytes; the service boundary re-encodes for the wire.
#[derive(Debug, Clone)]
pub struct SpeechGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    voice_language: String,
    voice_name: String,
}

impl SpeechGateway {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            endpoint: settings.speech_endpoint.clone(),
            api_key: settings.speech_api_key.clone(),
            voice_language: settings.voice_language.clone(),
            voice_name: settings.voice_name.clone(),
        }
    }

    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, GatewayError> {
        let body = json!({
            "input": { "text": text },
            "voice": { "languageCode": self.voice_language, "name": self.voice_name },
            "audioConfig": { "audioEncoding": "MP3" }
        });
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(format!("speech request failed: {}", err)))?;
        let status = response.status();
        let payload = response.text().await.map_err(|err| {
            GatewayError::Transport(format!("speech response unreadable: {}", err))
        })?;
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited(format!(
                "speech quota exhausted ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "speech service error ({})",
                status
            )));
        }
        parse_speech_response(&payload)
    }
}

#[derive(Debug, Deserialize)]
struct SpeechResponse {
    #[serde(rename = "audioContent")]
    audio_content: Option<String>,
}

fn parse_speech_response(body: &str) -> Result<Vec<u8>, GatewayError> {
    let payload: SpeechResponse = serde_json::from_str(body).map_err(|err| {
        GatewayError::Transport(format!("failed to parse speech response: {}", err))
    })?;
    let encoded = payload
        .audio_content
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| GatewayError::EmptyResult("speech returned no audio".to_string()))?;
    BASE64
        .decode(encoded.trim())
        .map_err(|err| GatewayError::Transport(format!("speech audio undecodable: {}", err)))
}
