use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::GenericImageView;
use std::path::Path;

const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// The clicked media content, decoded far enough to know its pixel size.
#[derive(Debug, Clone)]
pub struct MediaFrame {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub width: u32,
    pub height: u32,
}

/// Fetches the media behind a URL. `data:` URLs carry captured video frames
/// inline and are decoded locally; everything else goes over the wire
/// without credentials.
pub async fn fetch_media(client: &reqwest::Client, url: &str) -> Result<MediaFrame> {
    if let Some(rest) = url.strip_prefix("data:") {
        return frame_from_data_url(rest);
    }
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed to fetch media: {}", url))?;
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("media fetch failed ({}): {}", status, url));
    }
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("failed to read media body: {}", url))?;
    frame_from_bytes(bytes.to_vec())
}

/// Reads a local file as a media frame, for one-shot scans.
pub fn read_media_file(path: &Path) -> Result<MediaFrame> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read media file: {}", path.display()))?;
    frame_from_bytes(bytes)
}

pub fn frame_from_base64(encoded: &str) -> Result<MediaFrame> {
    let bytes = BASE64
        .decode(encoded.trim())
        .with_context(|| "failed to decode base64 media payload")?;
    frame_from_bytes(bytes)
}

pub fn frame_from_bytes(bytes: Vec<u8>) -> Result<MediaFrame> {
    let mime = sniff_mime(&bytes);
    let image = image::load_from_memory(&bytes)
        .with_context(|| "failed to decode media frame")?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("media frame has zero size"));
    }
    Ok(MediaFrame {
        bytes,
        mime,
        width,
        height,
    })
}

fn frame_from_data_url(rest: &str) -> Result<MediaFrame> {
    let payload = rest
        .split_once(";base64,")
        .map(|(_, payload)| payload)
        .ok_or_else(|| anyhow!("unsupported data url, expected ;base64, payload"))?;
    frame_from_base64(payload)
}

fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| OCTET_STREAM_MIME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let pixels = image::RgbaImage::from_pixel(width, height, image::Rgba([40, 40, 40, 255]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(pixels)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn decodes_png_bytes_with_dimensions() {
        let frame = frame_from_bytes(png_bytes(4, 3)).unwrap();
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 3);
        assert_eq!(frame.mime, "image/png");
    }

    #[test]
    fn decodes_data_url_payload() {
        let encoded = BASE64.encode(png_bytes(2, 2));
        let frame = frame_from_data_url(&format!("image/png;base64,{}", encoded)).unwrap();
        assert_eq!(frame.width, 2);
    }

    #[test]
    fn rejects_data_url_without_base64_marker() {
        assert!(frame_from_data_url("text/plain,hello").is_err());
    }

    #[test]
    fn rejects_undecodable_bytes() {
        assert!(frame_from_bytes(vec![0u8; 16]).is_err());
    }
}
