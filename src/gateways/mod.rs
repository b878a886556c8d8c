mod ocr;
mod speech;
mod translate;

pub use ocr::OcrGateway;
pub use speech::SpeechGateway;
pub use translate::TranslateGateway;

use std::fmt;

/// Failure classification for every outbound call. Converts into
/// `anyhow::Error` without losing the kind, which the service layer maps
/// onto HTTP statuses.
#[derive(Debug)]
pub enum GatewayError {
    Transport(String),
    EmptyResult(String),
    RateLimited(String),
}

impl GatewayError {
    pub fn message(&self) -> &str {
        match self {
            GatewayError::Transport(message)
            | GatewayError::EmptyResult(message)
            | GatewayError::RateLimited(message) => message,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for GatewayError {}
