use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::GatewayError;
use crate::settings::Settings;

/// Translation chain: DeepL first, then one silent retry through the public
/// Google endpoint. Only a double failure reaches the caller.
#[derive(Debug, Clone)]
pub struct TranslateGateway {
    client: reqwest::Client,
    deepl_endpoint: String,
    deepl_key: String,
    fallback_endpoint: String,
    source_lang: String,
    target_lang: String,
}

impl TranslateGateway {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            deepl_endpoint: settings.deepl_endpoint.clone(),
            deepl_key: settings.deepl_key.clone(),
            fallback_endpoint: settings.fallback_endpoint.clone(),
            source_lang: settings.source_lang.clone(),
            target_lang: settings.target_lang.clone(),
        }
    }

    pub async fn translate(&self, text: &str) -> Result<String, GatewayError> {
        match self.deepl(text).await {
            Ok(translation) => Ok(translation),
            Err(err) => {
                warn!("DeepL failed ({}); retrying via public endpoint", err);
                self.fallback(text).await
            }
        }
    }

    async fn deepl(&self, text: &str) -> Result<String, GatewayError> {
        // DeepL wants its language codes uppercase.
        let source = self.source_lang.to_uppercase();
        let target = self.target_lang.to_uppercase();
        let form = [
            ("text", text),
            ("target_lang", target.as_str()),
            ("source_lang", source.as_str()),
        ];
        let response = self
            .client
            .post(&self.deepl_endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.deepl_key))
            .form(&form)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(format!("deepl request failed: {}", err)))?;
        let status = response.status();
        let body = response.text().await.map_err(|err| {
            GatewayError::Transport(format!("deepl response unreadable: {}", err))
        })?;
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 456 {
            return Err(GatewayError::RateLimited(format!(
                "deepl quota exhausted ({})",
                status
            )));
        }
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "deepl service error ({})",
                status
            )));
        }
        parse_deepl_response(&body)
    }

    async fn fallback(&self, text: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .get(&self.fallback_endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_lang.as_str()),
                ("tl", self.target_lang.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|err| {
                GatewayError::Transport(format!("fallback translation failed: {}", err))
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|err| {
            GatewayError::Transport(format!("fallback response unreadable: {}", err))
        })?;
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "fallback translation error ({})",
                status
            )));
        }
        flatten_segments(&body)
    }
}

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    #[serde(default)]
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    text: String,
}

fn parse_deepl_response(body: &str) -> Result<String, GatewayError> {
    let payload: DeeplResponse = serde_json::from_str(body).map_err(|err| {
        GatewayError::Transport(format!("failed to parse deepl response: {}", err))
    })?;
    payload
        .translations
        .into_iter()
        .next()
        .map(|translation| translation.text)
        .ok_or_else(|| GatewayError::EmptyResult("translation returned no result".to_string()))
}

/// The public endpoint answers with nested segment lists; the translation is
/// the concatenation of each segment's first element.
fn flatten_segments(body: &str) -> Result<String, GatewayError> {
    let payload: Value = serde_json::from_str(body).map_err(|err| {
        GatewayError::Transport(format!("failed to parse fallback response: {}", err))
    })?;
    let segments = payload
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::EmptyResult("translation returned no result".to_string()))?;
    let mut out = String::new();
    for segment in segments {
        if let Some(text) = segment.get(0).and_then(Value::as_str) {
            out.push_str(text);
        }
    }
    if out.is_empty() {
        return Err(GatewayError::EmptyResult(
            "translation returned no result".to_string(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deepl_first_translation_wins() {
        let body = r#"{"translations": [{"text": "hello world"}, {"text": "ignored"}]}"#;
        assert_eq!(parse_deepl_response(body).unwrap(), "hello world");
    }

    #[test]
    fn deepl_without_translations_is_empty_result() {
        let error = parse_deepl_response(r#"{"translations": []}"#).unwrap_err();
        assert!(matches!(error, GatewayError::EmptyResult(_)));
    }

    #[test]
    fn fallback_segments_are_flattened_in_order() {
        let body = r#"[[["Hello ", "Hallo ", null], ["world", "wereld", null]], null, "nl"]"#;
        assert_eq!(flatten_segments(body).unwrap(), "Hello world");
    }

    #[test]
    fn fallback_without_segments_is_empty_result() {
        assert!(matches!(
            flatten_segments("[null]").unwrap_err(),
            GatewayError::EmptyResult(_)
        ));
        assert!(matches!(
            flatten_segments("[[]]").unwrap_err(),
            GatewayError::EmptyResult(_)
        ));
    }
}
