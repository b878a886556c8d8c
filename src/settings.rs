use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub scan_endpoint: String,
    pub scan_api_key: String,
    pub scan_language: String,
    pub scan_engine: u8,
    pub deepl_endpoint: String,
    pub deepl_key: String,
    pub fallback_endpoint: String,
    pub source_lang: String,
    pub target_lang: String,
    pub speech_endpoint: String,
    pub speech_api_key: String,
    pub voice_language: String,
    pub voice_name: String,
    pub row_band: f64,
    pub same_line: f64,
    pub next_line: f64,
    pub server_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan_endpoint: "https://api.ocr.space/parse/image".to_string(),
            scan_api_key: String::new(),
            scan_language: "dut".to_string(),
            scan_engine: 2,
            deepl_endpoint: "https://api-free.deepl.com/v2/translate".to_string(),
            deepl_key: String::new(),
            fallback_endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            source_lang: "nl".to_string(),
            target_lang: "en".to_string(),
            speech_endpoint: "https://texttospeech.googleapis.com/v1/text:synthesize".to_string(),
            speech_api_key: String::new(),
            voice_language: "nl-NL".to_string(),
            voice_name: "nl-NL-Wavenet-A".to_string(),
            row_band: 20.0,
            same_line: 30.0,
            next_line: 60.0,
            server_addr: "127.0.0.1:8787".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    scan: Option<ScanSettings>,
    translate: Option<TranslateSettings>,
    speech: Option<SpeechSettings>,
    cluster: Option<ClusterSettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ScanSettings {
    endpoint: Option<String>,
    api_key: Option<String>,
    language: Option<String>,
    engine: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateSettings {
    deepl_endpoint: Option<String>,
    deepl_key: Option<String>,
    fallback_endpoint: Option<String>,
    source_lang: Option<String>,
    target_lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechSettings {
    endpoint: Option<String>,
    api_key: Option<String>,
    voice_language: Option<String>,
    voice_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClusterSettings {
    row_band: Option<f64>,
    same_line: Option<f64>,
    next_line: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(scan) = incoming.scan {
            merge_string(&mut self.scan_endpoint, scan.endpoint);
            merge_string(&mut self.scan_api_key, scan.api_key);
            merge_string(&mut self.scan_language, scan.language);
            if let Some(engine) = scan.engine {
                if engine > 0 {
                    self.scan_engine = engine;
                }
            }
        }
        if let Some(translate) = incoming.translate {
            merge_string(&mut self.deepl_endpoint, translate.deepl_endpoint);
            merge_string(&mut self.deepl_key, translate.deepl_key);
            merge_string(&mut self.fallback_endpoint, translate.fallback_endpoint);
            merge_string(&mut self.source_lang, translate.source_lang);
            merge_string(&mut self.target_lang, translate.target_lang);
        }
        if let Some(speech) = incoming.speech {
            merge_string(&mut self.speech_endpoint, speech.endpoint);
            merge_string(&mut self.speech_api_key, speech.api_key);
            merge_string(&mut self.voice_language, speech.voice_language);
            merge_string(&mut self.voice_name, speech.voice_name);
        }
        if let Some(cluster) = incoming.cluster {
            merge_threshold(&mut self.row_band, cluster.row_band);
            merge_threshold(&mut self.same_line, cluster.same_line);
            merge_threshold(&mut self.next_line, cluster.next_line);
        }
        if let Some(server) = incoming.server {
            merge_string(&mut self.server_addr, server.addr);
        }
    }
}

fn merge_string(target: &mut String, incoming: Option<String>) {
    if let Some(value) = incoming {
        if !value.trim().is_empty() {
            *target = value;
        }
    }
}

fn merge_threshold(target: &mut f64, incoming: Option<f64>) {
    if let Some(value) = incoming {
        if value > 0.0 {
            *target = value;
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".page-lens"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn defaults_match_embedded_settings() {
        with_temp_home(|_| {
            let settings = load_settings(None).unwrap();
            assert_eq!(settings.scan_language, "dut");
            assert_eq!(settings.scan_engine, 2);
            assert_eq!(settings.source_lang, "nl");
            assert_eq!(settings.target_lang, "en");
            assert_eq!(settings.voice_name, "nl-NL-Wavenet-A");
            assert_eq!(settings.row_band, 20.0);
            assert_eq!(settings.same_line, 30.0);
            assert_eq!(settings.next_line, 60.0);
        });
    }

    #[test]
    fn extra_file_overrides_thresholds() {
        with_temp_home(|dir| {
            let path = dir.join("override.toml");
            std::fs::write(
                &path,
                "[cluster]\nsame_line = 12.5\n\n[scan]\napi_key = \"k\"\n",
            )
            .unwrap();
            let settings = load_settings(Some(&path)).unwrap();
            assert_eq!(settings.same_line, 12.5);
            assert_eq!(settings.next_line, 60.0);
            assert_eq!(settings.scan_api_key, "k");
        });
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        with_temp_home(|dir| {
            let missing = dir.join("nope.toml");
            assert!(load_settings(Some(&missing)).is_err());
        });
    }

    #[test]
    fn zero_threshold_is_ignored() {
        with_temp_home(|dir| {
            let path = dir.join("zero.toml");
            std::fs::write(&path, "[cluster]\nrow_band = 0.0\n").unwrap();
            let settings = load_settings(Some(&path)).unwrap();
            assert_eq!(settings.row_band, 20.0);
        });
    }
}
