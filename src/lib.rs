use anyhow::{anyhow, Result};
use std::path::Path;

pub mod gateways;
pub mod geometry;
pub mod logging;
pub mod media;
pub mod notebook;
pub mod server;
pub mod session;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use gateways::{OcrGateway, SpeechGateway, TranslateGateway};
pub use session::{OverlayPhase, ScanSession};

#[derive(Debug, Clone)]
pub struct Config {
    pub data: Option<String>,
    pub serve: bool,
    pub addr: Option<String>,
    pub settings_path: Option<String>,
}

pub async fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    if config.serve {
        let addr = config
            .addr
            .as_deref()
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .unwrap_or(&settings.server_addr)
            .to_string();
        server::run_server(settings, addr).await?;
        return Ok(String::new());
    }

    let Some(data) = config.data.as_deref().map(str::trim).filter(|d| !d.is_empty()) else {
        return Err(anyhow!("nothing to do: pass --data <path-or-url> or --serve"));
    };
    scan_once(&settings, data).await
}

/// One-shot mode: scan a single image and print the clustered blocks as
/// JSON in OCR space. Screen mapping needs a rendered rect, which only the
/// server flow has.
async fn scan_once(settings: &settings::Settings, data: &str) -> Result<String> {
    let client = reqwest::Client::new();
    let frame = if data.starts_with("http://")
        || data.starts_with("https://")
        || data.starts_with("data:")
    {
        media::fetch_media(&client, data).await?
    } else {
        media::read_media_file(Path::new(data))?
    };

    let ocr = OcrGateway::new(client, settings);
    let raw = ocr.scan(&frame).await?;
    let words = geometry::normalize(raw, settings.row_band);
    let blocks = geometry::cluster(
        &words,
        geometry::ClusterThresholds {
            same_line: settings.same_line,
            next_line: settings.next_line,
        },
    );
    Ok(serde_json::to_string_pretty(&blocks)?)
}
