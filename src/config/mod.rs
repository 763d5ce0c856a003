//! Configuration management for `VisionSpeak`

pub mod file;

use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::{Error, Result};

use file::VisionSpeakConfigFile;

/// Default remote OCR endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/ocr";

/// Default longest side of a normalized capture
pub const DEFAULT_MAX_DIMENSION: u32 = 1600;

/// Default JPEG quality for uploads
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default bound for each network phase
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// `VisionSpeak` configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote OCR endpoint receiving the multipart upload
    pub endpoint: Url,

    /// Longest allowed side of a normalized image
    pub max_dimension: u32,

    /// JPEG quality for the upload payload
    pub jpeg_quality: u8,

    /// Network phase bounds
    pub timeouts: TimeoutConfig,

    /// Narration output configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Bounds for each phase of the recognition exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub connect: Duration,
    pub read: Duration,
    pub write: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: DEFAULT_TIMEOUT,
            read: DEFAULT_TIMEOUT,
            write: DEFAULT_TIMEOUT,
        }
    }
}

impl TimeoutConfig {
    /// Same bound for every phase
    #[must_use]
    pub const fn uniform(bound: Duration) -> Self {
        Self {
            connect: bound,
            read: bound,
            write: bound,
        }
    }
}

/// Speech provider used for narration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechProvider {
    /// `OpenAI` TTS
    OpenAi,
    /// `ElevenLabs` TTS
    ElevenLabs,
    /// Print utterances instead of playing audio
    Console,
}

impl FromStr for SpeechProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            "console" | "none" => Ok(Self::Console),
            other => Err(Error::Config(format!("unknown speech provider: {other}"))),
        }
    }
}

/// Narration output configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Play audio; when false narration goes to the console
    pub enabled: bool,

    /// Speech backend
    pub provider: SpeechProvider,

    /// TTS model (e.g. "tts-1", "eleven_monolingual_v1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: SpeechProvider::OpenAi,
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (TTS)
    pub openai: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            timeouts: TimeoutConfig::default(),
            voice: VoiceConfig::default(),
            api_keys: ApiKeys::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// Precedence is env > toml > default.
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn from_sources<F>(fc: VisionSpeakConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = match env("VISIONSPEAK_ENDPOINT").or(fc.recognition.endpoint) {
            Some(raw) => parse_endpoint(&raw)?,
            None => default_endpoint(),
        };

        let max_dimension = match env("VISIONSPEAK_MAX_DIMENSION") {
            Some(raw) => raw.parse().map_err(|_| {
                Error::Config(format!("VISIONSPEAK_MAX_DIMENSION is not a number: {raw}"))
            })?,
            None => fc.image.max_dimension.unwrap_or(DEFAULT_MAX_DIMENSION),
        };

        let uniform = env("VISIONSPEAK_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    Error::Config(format!("VISIONSPEAK_TIMEOUT_SECS is not a number: {raw}"))
                })
            })
            .transpose()?;
        let phase = |file_value: Option<u64>| {
            uniform
                .or(file_value)
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
        };
        let timeouts = TimeoutConfig {
            connect: phase(fc.recognition.connect_timeout_secs),
            read: phase(fc.recognition.read_timeout_secs),
            write: phase(fc.recognition.write_timeout_secs),
        };

        let defaults = VoiceConfig::default();
        let provider = match env("VISIONSPEAK_TTS_PROVIDER").or(fc.voice.provider) {
            Some(raw) => raw.parse()?,
            None => defaults.provider,
        };
        let voice = VoiceConfig {
            enabled: fc.voice.enabled.unwrap_or(defaults.enabled),
            provider,
            tts_model: fc.voice.tts_model.unwrap_or(defaults.tts_model),
            tts_voice: fc.voice.tts_voice.unwrap_or(defaults.tts_voice),
            tts_speed: fc.voice.tts_speed.unwrap_or(defaults.tts_speed),
        };

        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .map(SecretString::from),
            elevenlabs: env("ELEVENLABS_API_KEY")
                .or(fc.api_keys.elevenlabs)
                .map(SecretString::from),
        };

        let config = Self {
            endpoint,
            max_dimension,
            jpeg_quality: fc.recognition.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
            timeouts,
            voice,
            api_keys,
        };
        config.validate()?;

        tracing::debug!(
            endpoint = %config.endpoint,
            max_dimension = config.max_dimension,
            provider = ?config.voice.provider,
            "configuration resolved"
        );

        Ok(config)
    }

    /// Override the endpoint (CLI flag)
    ///
    /// # Errors
    ///
    /// Returns error if the URL cannot be parsed
    pub fn set_endpoint(&mut self, raw: &str) -> Result<()> {
        self.endpoint = parse_endpoint(raw)?;
        Ok(())
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(Error::Config("max_dimension must be positive".to_string()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Config(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        let t = self.timeouts;
        if t.connect.is_zero() || t.read.is_zero() || t.write.is_zero() {
            return Err(Error::Config("timeouts must be non-zero".to_string()));
        }
        if !(0.25..=4.0).contains(&self.voice.tts_speed) {
            return Err(Error::Config(format!(
                "tts_speed must be within 0.25..=4.0, got {}",
                self.voice.tts_speed
            )));
        }
        Ok(())
    }
}

/// Parsed [`DEFAULT_ENDPOINT`]
static DEFAULT_ENDPOINT_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse(DEFAULT_ENDPOINT).expect("valid default endpoint"));

fn default_endpoint() -> Url {
    DEFAULT_ENDPOINT_URL.clone()
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("invalid endpoint {raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::Config(format!(
            "endpoint must be http or https, got {scheme}"
        ))),
    }
}
