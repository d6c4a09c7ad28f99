use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Language codes following ISO 639-1 with regional variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Default translation target language code
pub const DEFAULT_TARGET_LANG: &str = "zh-CN";

/// Archive store configuration for a GitHub repository used as object storage.
///
/// The repository holds one directory per owner; artifact existence and
/// variant are encoded entirely in the key string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Repository owner (user or organization)
    pub repo_owner: String,
    /// Repository name
    pub repo_name: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Personal access token; injected server-side, never exposed to callers
    pub token: Option<String>,
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            repo_owner: String::new(),
            repo_name: String::new(),
            branch: default_branch(),
            token: None,
            api_base: default_github_api_base(),
        }
    }
}

/// OCR extraction provider configuration (Mistral-compatible OCR API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_api_base")]
    pub api_base: String,
    pub api_key: Option<String>,
    #[serde(default = "default_ocr_model")]
    pub model: String,
    /// Pages per OCR request; large documents are split into ranges of this size
    #[serde(default = "default_chunk_pages")]
    pub chunk_pages: usize,
    /// Inline extracted images as base64 data URIs in the page markdown
    #[serde(default = "default_true")]
    pub include_images: bool,
}

fn default_ocr_api_base() -> String {
    "https://api.mistral.ai/v1".to_string()
}

fn default_ocr_model() -> String {
    "mistral-ocr-latest".to_string()
}

const fn default_chunk_pages() -> usize {
    5
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_base: default_ocr_api_base(),
            api_key: None,
            model: default_ocr_model(),
            chunk_pages: default_chunk_pages(),
            include_images: true,
        }
    }
}

/// Translator backend configuration for OpenAI-compatible chat APIs.
///
/// Supports DeepSeek, OpenAI, llama.cpp, Ollama, and any other
/// OpenAI-compatible API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_translator_api_base")]
    pub api_base: String,
    pub api_key: Option<String>,
    #[serde(default = "default_translator_model")]
    pub model: String,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Character budget per translation batch; text is split on paragraph
    /// boundaries to stay under this limit
    #[serde(default = "default_max_batch_chars")]
    pub max_batch_chars: usize,
    /// Number of batch requests in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_translator_api_base() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_translator_model() -> String {
    "deepseek-chat".to_string()
}

const fn default_retry_count() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

const fn default_max_batch_chars() -> usize {
    2000
}

const fn default_concurrency() -> usize {
    8
}

impl TranslatorConfig {
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            ..Default::default()
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_base: default_translator_api_base(),
            api_key: None,
            model: default_translator_model(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            max_batch_chars: default_max_batch_chars(),
            concurrency: default_concurrency(),
        }
    }
}

/// Pipeline behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target language for translation
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Continuous-reading preset: force translation and dual-merge for every
    /// new upload regardless of the per-upload options
    #[serde(default)]
    pub continuous_reading: bool,

    /// Viewport fraction past a checkpoint at which the source view is
    /// commanded to turn the page (scroll-sync anticipation)
    #[serde(default = "default_anticipation")]
    pub anticipation: f32,
}

const fn default_anticipation() -> f32 {
    0.30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_lang: default_target_lang(),
            continuous_reading: false,
            anticipation: default_anticipation(),
        }
    }
}

/// Artifact content cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable memory cache
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Maximum memory cache size in megabytes
    #[serde(default = "default_memory_max_mb")]
    pub memory_max_mb: u64,

    /// Memory cache TTL in seconds (0 = no expiry)
    #[serde(default)]
    pub memory_ttl_seconds: u64,

    /// Enable disk cache
    #[serde(default = "default_true")]
    pub disk_enabled: bool,

    /// Disk cache directory (defaults to .cache/paper-archive)
    pub disk_path: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

const fn default_memory_max_mb() -> u64 {
    256
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            memory_max_mb: default_memory_max_mb(),
            memory_ttl_seconds: 0,
            disk_enabled: true,
            disk_path: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Archive store (GitHub repository) configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// OCR extraction provider configuration
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Translation provider configuration
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Pipeline behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Artifact content cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        toml::from_str(&content)
            .map_err(|e| crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}")))
    }

    /// Load from default locations (~/.config/paper-archive/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = config_dir() {
            let user_config = config_dir.join("paper-archive").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        // Return defaults
        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Check requirements that serde defaults cannot express: the archive
    /// repository has no usable default, and the sync anticipation must be a
    /// viewport fraction.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.store.repo_owner.is_empty() {
            return Err(crate::error::Error::ConfigMissing(
                "store.repo_owner".to_string(),
            ));
        }
        if self.store.repo_name.is_empty() {
            return Err(crate::error::Error::ConfigMissing(
                "store.repo_name".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pipeline.anticipation) {
            return Err(crate::error::Error::ConfigInvalid {
                field: "pipeline.anticipation".to_string(),
                reason: "must be a viewport fraction between 0 and 1".to_string(),
            });
        }
        Ok(())
    }
}

/// The user's config directory following XDG conventions:
/// `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.target_lang.as_str(), "zh-CN");
        assert_eq!(config.ocr.chunk_pages, 5);
        assert_eq!(config.translator.max_batch_chars, 2000);
        assert!((config.pipeline.anticipation - 0.30).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            repo_owner = "acme"
            repo_name = "paper-store"

            [translator]
            api_key = "sk-test"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.repo_owner, "acme");
        assert_eq!(config.store.branch, "main");
        assert_eq!(config.translator.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.translator.model, "deepseek-chat");
        assert_eq!(config.translator.concurrency, 8);
    }

    #[test]
    fn test_validate_reports_missing_repo() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(crate::error::Error::ConfigMissing(field)) if field == "store.repo_owner"
        ));

        let mut config = AppConfig::default();
        config.store.repo_owner = "acme".to_string();
        assert!(matches!(
            config.validate(),
            Err(crate::error::Error::ConfigMissing(field)) if field == "store.repo_name"
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_anticipation() {
        let mut config = AppConfig::default();
        config.store.repo_owner = "acme".to_string();
        config.store.repo_name = "paper-store".to_string();
        assert!(config.validate().is_ok());

        config.pipeline.anticipation = 1.5;
        assert!(matches!(
            config.validate(),
            Err(crate::error::Error::ConfigInvalid { field, .. }) if field == "pipeline.anticipation"
        ));
    }
}
