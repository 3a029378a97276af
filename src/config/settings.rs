//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every section is `#[serde(default)]`, so a hand-written `settings.toml`
//! only needs the keys it wants to override.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ---------------------------------------------------------------------------
// ChatModel
// ---------------------------------------------------------------------------

/// Chat-completions model used for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChatModel {
    #[serde(rename = "gpt-5-mini")]
    Gpt5Mini,
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
}

impl ChatModel {
    /// Model identifier sent to the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatModel::Gpt5Mini => "gpt-5-mini",
            ChatModel::Gpt4oMini => "gpt-4o-mini",
            ChatModel::Gpt4o => "gpt-4o",
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechModel
// ---------------------------------------------------------------------------

/// Text-to-speech model.  `tts-1-hd` trades latency for quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeechModel {
    #[default]
    #[serde(rename = "tts-1")]
    Tts1,
    #[serde(rename = "tts-1-hd")]
    Tts1Hd,
}

impl SpeechModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechModel::Tts1 => "tts-1",
            SpeechModel::Tts1Hd => "tts-1-hd",
        }
    }
}

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

/// Built-in speech voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    #[default]
    Nova,
    Shimmer,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Shimmer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }

    /// Case-insensitive lookup by name; `None` for unknown voices.
    ///
    /// ```
    /// use bilingual_reader::config::Voice;
    ///
    /// assert_eq!(Voice::from_name("Onyx"), Some(Voice::Onyx));
    /// assert_eq!(Voice::from_name("robot"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Voice> {
        Voice::ALL
            .into_iter()
            .find(|voice| voice.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

// ---------------------------------------------------------------------------
// TranslationConfig
// ---------------------------------------------------------------------------

/// Settings for the translation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Base URL of the OpenAI-compatible API, including the version prefix.
    pub base_url: String,
    /// API key.  When `None` or empty, [`API_KEY_ENV`] is consulted.
    pub api_key: Option<String>,
    /// Chat model used for translation.
    pub model: ChatModel,
    /// Language of the input text, as a name the model understands.
    pub source_language: String,
    /// Language to translate into.
    pub target_language: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Upper bound on tokens in one translated sentence.
    pub max_tokens: u32,
    /// Per-request timeout for both translation and speech calls.
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: ChatModel::default(),
            source_language: "English".into(),
            target_language: "French".into(),
            temperature: 0.3,
            max_tokens: 500,
            timeout_secs: 30,
        }
    }
}

impl TranslationConfig {
    /// The configured key, or the value of [`API_KEY_ENV`] when none is set.
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for speech synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub model: SpeechModel,
    pub voice: Voice,
    /// Playback speed multiplier baked into the synthesized audio.
    pub speed: f32,
    /// Encoded response format requested from the service (`mp3`, `wav` …).
    pub format: String,
}

impl SpeechConfig {
    pub const MIN_SPEED: f32 = 0.25;
    pub const MAX_SPEED: f32 = 4.0;

    /// Clamp `speed` into the range the speech service accepts.
    pub fn clamp_speed(speed: f32) -> f32 {
        if speed.is_nan() {
            return 1.0;
        }
        speed.clamp(Self::MIN_SPEED, Self::MAX_SPEED)
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model: SpeechModel::default(),
            voice: Voice::default(),
            speed: 1.0,
            format: "mp3".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SegmenterConfig
// ---------------------------------------------------------------------------

/// Sentence segmentation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Abbreviations protected in addition to the built-in English table.
    pub extra_abbreviations: Vec<String>,
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global "advance playback" hotkey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Listen for the key system-wide.  Off by default.
    pub enabled: bool,
    /// Key name (e.g. `"F8"`, `"Pause"`).
    pub advance_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            advance_key: "F8".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use bilingual_reader::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// println!("translating into {}", config.translation.target_language);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub translation: TranslationConfig,
    pub speech: SpeechConfig,
    pub segmenter: SegmenterConfig,
    pub hotkey: HotkeyConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
