//! TOML configuration file loading
//!
//! Supports `~/.config/visionspeak/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VisionSpeakConfigFile {
    /// Recognition endpoint and upload settings
    #[serde(default)]
    pub recognition: RecognitionFileConfig,

    /// Image normalization settings
    #[serde(default)]
    pub image: ImageFileConfig,

    /// Narration/voice configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Remote OCR endpoint configuration
#[derive(Debug, Default, Deserialize)]
pub struct RecognitionFileConfig {
    /// Endpoint URL (e.g. "http://192.168.1.16:5000/ocr")
    pub endpoint: Option<String>,

    /// JPEG quality for uploads (1-100)
    pub jpeg_quality: Option<u8>,

    /// Connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,

    /// Read timeout in seconds
    pub read_timeout_secs: Option<u64>,

    /// Write timeout in seconds
    pub write_timeout_secs: Option<u64>,
}

/// Image normalization configuration
#[derive(Debug, Default, Deserialize)]
pub struct ImageFileConfig {
    /// Longest allowed side in pixels
    pub max_dimension: Option<u32>,
}

/// Voice output configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable audio output
    pub enabled: Option<bool>,

    /// Speech provider ("openai", "elevenlabs", "console")
    pub provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VisionSpeakConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> VisionSpeakConfigFile {
    config_file_path().map_or_else(VisionSpeakConfigFile::default, |path| {
        load_config_file_from(&path)
    })
}

/// Load a TOML config file from an explicit path
pub fn load_config_file_from(path: &Path) -> VisionSpeakConfigFile {
    if !path.exists() {
        return VisionSpeakConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VisionSpeakConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VisionSpeakConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/visionspeak/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("visionspeak").join("config.toml"))
}
