//! Configuration management for thanks-to-me.
//!
//! Loads config from YAML files in standard locations, then applies
//! environment overrides for vendor keys and endpoints.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "models/gemini-2.0-flash-exp".into(),
            max_tokens: 1000,
            temperature: 0.7,
            max_attempts: 3,
            backoff_ms: 1000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub enabled: bool,
    pub api_key: String,
    pub base_url: String,
    pub language_code: String,
    pub voice: String,
    pub ssml_gender: String,
    pub speaking_rate: f32,
    pub pitch: f32,
    pub effects_profile: String,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            base_url: "https://texttospeech.googleapis.com/v1".into(),
            language_code: "ko-KR".into(),
            voice: "ko-KR-Chirp3-HD-Achernar".into(),
            ssml_gender: "FEMALE".into(),
            speaking_rate: 1.0,
            pitch: 0.0,
            effects_profile: "headphone-class-device".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8780,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the key/value blobs. Empty means `~/.thanks-to-me`.
    pub dir: String,
}

impl StorageConfig {
    pub fn resolve_dir(&self) -> PathBuf {
        if !self.dir.is_empty() {
            return PathBuf::from(&self.dir);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".thanks-to-me")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_duration_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 30 * 60,
        }
    }
}

/// Optional overrides for the mood keyword lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    pub positive_words: Option<Vec<String>>,
    pub negative_words: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub mood: MoodConfig,
}

impl Config {
    /// Load configuration from YAML file, then apply environment overrides.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/thanks-to-me/config.yaml
    /// 3. /etc/thanks-to-me/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = Self::load_file(path);
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn load_file(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/thanks-to-me/config.yaml")),
                Some(PathBuf::from("/etc/thanks-to-me/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match serde_yml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    /// Overlay values from the environment. `lookup` is injectable so tests
    /// don't have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("GEMINI_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = non_empty("GEMINI_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = non_empty("GEMINI_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = non_empty("GEMINI_MAX_TOKENS") {
            match v.parse() {
                Ok(n) => self.llm.max_tokens = n,
                Err(_) => warn!("Ignoring invalid GEMINI_MAX_TOKENS={v}"),
            }
        }
        if let Some(v) = non_empty("GOOGLE_CLOUD_TTS_API_KEY") {
            self.tts.api_key = v;
        }
        if let Some(v) = non_empty("THANKS_TO_ME_DATA_DIR") {
            self.storage.dir = v;
        }
    }

    /// Warn about missing vendor keys. Returns false if any are missing.
    pub fn validate(&self) -> bool {
        let mut ok = true;
        if self.llm.api_key.is_empty() {
            warn!("Missing GEMINI_API_KEY: conversation replies will use fallback text");
            ok = false;
        }
        if self.tts.enabled && self.tts.api_key.is_empty() {
            warn!("Missing GOOGLE_CLOUD_TTS_API_KEY: spoken replies are unavailable");
            ok = false;
        }
        ok
    }
}
