//! Configuration system for Z-Scout.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/zscout/config.toml` and/or `.zscout/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::gateway::ServerConfig;
use crate::report::quality::QualityThresholds;

/// Top-level configuration for the Z-Scout backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZScoutConfig {
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Gemini provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model identifier (e.g., "gemini-2.5-flash").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// API key set directly (takes precedence over `api_key_env`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default temperature for generation.
    pub temperature: f32,
    /// Maximum tokens to generate for a report on the first attempt.
    pub max_output_tokens: u32,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whether report requests use Google Search grounding unless the caller says otherwise.
    pub grounding_by_default: bool,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_output_tokens: 8192,
            timeout_secs: 120,
            connect_timeout_secs: 10,
            grounding_by_default: true,
        }
    }
}

/// Backoff policy for transient provider errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    /// Add up to 25% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 32_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Report quality thresholds and the amplified retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Whether a low-quality report triggers one amplified retry.
    pub retry_enabled: bool,
    /// Minimum characters across all section titles and contents.
    pub min_total_chars: usize,
    pub min_sections: usize,
    pub min_references: usize,
    /// Multiplier applied to section/reference targets and output tokens on retry.
    pub amplification: f32,
    /// Upper bound for `maxOutputTokens` on the amplified retry.
    pub max_output_tokens_cap: u32,
    /// Longest accepted query, in characters.
    pub max_query_chars: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            retry_enabled: true,
            min_total_chars: 5000,
            min_sections: 5,
            min_references: 8,
            amplification: 1.5,
            max_output_tokens_cap: 65_536,
            max_query_chars: 2000,
        }
    }
}

impl QualityConfig {
    /// The thresholds a first-attempt report is measured against.
    pub fn thresholds(&self) -> QualityThresholds {
        QualityThresholds {
            min_total_chars: self.min_total_chars,
            min_sections: self.min_sections,
            min_references: self.min_references,
        }
    }

    /// Scale a target by the amplification factor, never below the original.
    pub fn amplify(&self, target: usize) -> usize {
        let scaled = (target as f32 * self.amplification).ceil() as usize;
        scaled.max(target)
    }
}

/// Limits for the subtopic, abstract, and chat handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Default number of subtopics returned by extraction.
    pub max_subtopics: usize,
    /// Characters of each section's content sent to the abstract prompt.
    pub abstract_section_chars: usize,
    /// Target abstract length in words.
    pub abstract_words: usize,
    /// Characters of report context embedded in the chat system instruction.
    pub chat_context_chars: usize,
    /// Most recent chat messages kept in a request.
    pub chat_history_limit: usize,
    /// Temperature for extraction and abstract calls.
    pub temperature: f32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_subtopics: 6,
            abstract_section_chars: 1500,
            abstract_words: 200,
            chat_context_chars: 12_000,
            chat_history_limit: 20,
            temperature: 0.3,
        }
    }
}

/// Concurrency and size limits for subtopic scraping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Largest subtopic batch accepted in one request.
    pub max_subtopics: usize,
    /// Subtopic requests in flight at once.
    pub max_concurrency: usize,
    pub max_output_tokens: u32,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_subtopics: 10,
            max_concurrency: 3,
            max_output_tokens: 2048,
        }
    }
}

/// Where generated reports are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Whether generated reports are saved.
    pub enabled: bool,
    /// Directory override; defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reports_dir: None,
        }
    }
}

impl StorageConfig {
    /// Resolve the reports directory: explicit override, then the platform data
    /// directory, then `<workspace>/.zscout/reports`.
    pub fn resolve_reports_dir(&self, workspace: &Path) -> PathBuf {
        if let Some(dir) = &self.reports_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("dev", "zscout", "zscout")
            .map(|d| d.data_dir().join("reports"))
            .unwrap_or_else(|| workspace.join(".zscout").join("reports"))
    }
}

impl ZScoutConfig {
    /// Validate this config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid. Warnings are human-readable and
    /// never fatal.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.gemini.temperature < 0.0 || self.gemini.temperature > 2.0 {
            warnings.push(format!(
                "gemini.temperature ({}) is outside the range 0.0-2.0",
                self.gemini.temperature
            ));
        }
        if self.quality.amplification <= 1.0 {
            warnings.push(format!(
                "quality.amplification ({}) <= 1.0; the retry will ask for no more than the first attempt",
                self.quality.amplification
            ));
        }
        if self.quality.max_output_tokens_cap < self.gemini.max_output_tokens {
            warnings.push(format!(
                "quality.max_output_tokens_cap ({}) is below gemini.max_output_tokens ({})",
                self.quality.max_output_tokens_cap, self.gemini.max_output_tokens
            ));
        }
        if self.scrape.max_concurrency == 0 {
            warnings.push("scrape.max_concurrency is 0; scraping will run one at a time".into());
        }
        if self.research.max_subtopics == 0 {
            warnings.push("research.max_subtopics is 0; extraction will always fail".into());
        }
        warnings
    }
}

/// Load configuration with layered merging:
/// defaults -> user config -> workspace config -> `ZSCOUT_` environment -> overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ZScoutConfig>,
) -> Result<ZScoutConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ZScoutConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "zscout", "zscout") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (ZSCOUT_GEMINI__MODEL, ZSCOUT_SERVER__PORT, etc.)
    figment = figment.merge(Env::prefixed("ZSCOUT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    Ok(figment.extract()?)
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".zscout").join("config.toml")
}

/// Render the default configuration as TOML.
pub fn default_config_toml() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&ZScoutConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ZScoutConfig::default();
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.api_key_env, "GEMINI_API_KEY");
        assert!(config.gemini.grounding_by_default);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.quality.retry_enabled);
        assert_eq!(config.quality.min_sections, 5);
        assert_eq!(config.scrape.max_concurrency, 3);
        assert!(config.storage.enabled);
    }

    #[test]
    fn test_default_config_has_no_warnings() {
        assert!(ZScoutConfig::default().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_bad_values() {
        let mut config = ZScoutConfig::default();
        config.gemini.temperature = 3.5;
        config.quality.amplification = 1.0;
        config.scrape.max_concurrency = 0;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("temperature"));
        assert!(warnings[1].contains("amplification"));
        assert!(warnings[2].contains("max_concurrency"));
    }

    #[test]
    fn test_amplify_rounds_up_and_never_shrinks() {
        let quality = QualityConfig::default();
        assert_eq!(quality.amplify(5), 8);
        assert_eq!(quality.amplify(8), 12);

        let shrinking = QualityConfig {
            amplification: 0.5,
            ..QualityConfig::default()
        };
        assert_eq!(shrinking.amplify(8), 8);
    }

    #[test]
    fn test_thresholds_from_quality_config() {
        let thresholds = QualityConfig::default().thresholds();
        assert_eq!(thresholds.min_total_chars, 5000);
        assert_eq!(thresholds.min_sections, 5);
        assert_eq!(thresholds.min_references, 8);
    }

    #[test]
    fn test_load_config_reads_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".zscout");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            "[gemini]\nmodel = \"gemini-2.5-pro\"\n\n[quality]\nmin_references = 12\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.gemini.model, "gemini-2.5-pro");
        assert_eq!(config.quality.min_references, 12);
        // Untouched keys keep their defaults.
        assert_eq!(config.quality.min_sections, 5);
    }

    #[test]
    fn test_load_config_rejects_bad_value() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".zscout");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[server]\nport = \"eighty\"\n").unwrap();

        let err = load_config(Some(dir.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_load_config_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let mut overrides = ZScoutConfig::default();
        overrides.server.port = 9999;
        let config = load_config(Some(dir.path()), Some(&overrides)).unwrap();
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_default_config_toml_round_trips() {
        let rendered = default_config_toml().unwrap();
        assert!(rendered.contains("[gemini]"));
        let parsed: ZScoutConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.gemini.model, "gemini-2.5-flash");
        assert_eq!(parsed.server.port, ServerConfig::default().port);
    }

    #[test]
    fn test_reports_dir_override() {
        let storage = StorageConfig {
            enabled: true,
            reports_dir: Some(PathBuf::from("/tmp/zscout-reports")),
        };
        assert_eq!(
            storage.resolve_reports_dir(Path::new(".")),
            PathBuf::from("/tmp/zscout-reports")
        );
    }
}
