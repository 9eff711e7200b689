use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agent::RetryPolicy;
use crate::artifacts::AnalysisSettings;

const CONFIG_STEM: &str = "citriage";
const CONFIG_EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];

/// Configuration file structure for citriage.
///
/// Every field has a default, so an empty or missing file is a valid
/// configuration. Command-line flags and `INFERENCE_*` environment variables
/// are applied on top by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// OpenAI-compatible inference endpoint
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Backoff applied to inference calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Artifact analysis parameters
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InferenceConfig {
    /// Endpoint base URL, without the `/v1` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    /// Not every endpoint accepts this; omitted from requests when unset
    pub top_p: Option<f32>,

    pub frequency_penalty: Option<f32>,

    /// Model turns allowed in one agentic analysis
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalysisConfig {
    /// Build log lines kept when no structured evidence exists
    #[serde(default = "default_build_log_tail")]
    pub build_log_tail: usize,

    /// Distinct error signatures kept by frequency reduction
    #[serde(default = "default_top_n_errors")]
    pub top_n_errors: usize,

    /// Character ceiling for evidence sent to the model
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// External clustering command (e.g. `logmine`); built-in counting when unset
    pub cluster_command: Option<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            token: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            top_p: None,
            frequency_penalty: None,
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            build_log_tail: default_build_log_tail(),
            top_n_errors: default_top_n_errors(),
            max_context_chars: default_max_context_chars(),
            cluster_command: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_model() -> String {
    "llama-3-2-3b".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_max_tool_iterations() -> u32 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_secs() -> f64 {
    5.0
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay_secs() -> f64 {
    30.0
}

fn default_build_log_tail() -> usize {
    100
}

fn default_top_n_errors() -> usize {
    10
}

fn default_max_context_chars() -> usize {
    15_000
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: seconds(self.delay_secs),
            backoff_multiplier: self.backoff_multiplier,
            max_delay: seconds(self.max_delay_secs),
        }
    }
}

impl AnalysisConfig {
    pub fn settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            build_log_tail: self.build_log_tail,
            top_n_errors: self.top_n_errors,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./citriage.{toml,json,yaml,yml}
    /// 3. <user config dir>/citriage/citriage.{toml,json,yaml,yml}
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                log::warn!("Config file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            return Self::load_from_path(path);
        }

        let user_dir = dirs::config_dir().map(|dir| dir.join(CONFIG_STEM));
        let search_dirs = [Some(PathBuf::from(".")), user_dir];

        for dir in search_dirs.iter().flatten() {
            for extension in CONFIG_EXTENSIONS {
                let candidate = dir.join(format!("{CONFIG_STEM}.{extension}"));
                if candidate.exists() {
                    log::debug!("Using config file {}", candidate.display());
                    return Self::load_from_path(&candidate);
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()).unwrap_or("") {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file, picking the format from its extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.inference.timeout_secs, 120);
        assert_eq!(config.inference.max_tool_iterations, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.analysis.build_log_tail, 100);
        assert_eq!(config.analysis.top_n_errors, 10);
        assert_eq!(config.analysis.max_context_chars, 15_000);
        assert!(config.analysis.cluster_command.is_none());
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[inference]
base-url = "https://inference.example.com"
model = "granite"
token = "secret"
top-p = 0.9

[retry]
max-attempts = 5
delay-secs = 0.5

[analysis]
top-n-errors = 3
cluster-command = "logmine -m 0.4"
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.inference.base_url, "https://inference.example.com");
        assert_eq!(config.inference.model, "granite");
        assert_eq!(config.inference.token.as_deref(), Some("secret"));
        assert_eq!(config.inference.top_p, Some(0.9));
        assert_eq!(config.inference.frequency_penalty, None);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff_multiplier, 2.0);
        assert_eq!(config.analysis.top_n_errors, 3);
        assert_eq!(config.analysis.build_log_tail, 100);
        assert_eq!(config.analysis.cluster_command.as_deref(), Some("logmine -m 0.4"));
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "inference": {"model": "llama", "max-tool-iterations": 2},
  "analysis": {"max-context-chars": 500}
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.inference.model, "llama");
        assert_eq!(config.inference.max_tool_iterations, 2);
        assert_eq!(config.analysis.max_context_chars, 500);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "retry:\n  max-delay-secs: 12.5\n").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.retry.max_delay_secs, 12.5);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load(Some(Path::new("nonexistent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_round_trips_every_format() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.inference.model = "saved-model".to_string();
        config.analysis.cluster_command = Some("logmine".to_string());

        for name in ["c.toml", "c.json", "c.yaml"] {
            let path = temp_dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(Config::load_from_path(&path).unwrap(), config, "{name}");
        }
    }

    mod retry_config {
        use super::*;

        #[test]
        fn converts_to_policy() {
            let policy = RetryConfig {
                max_attempts: 4,
                delay_secs: 1.5,
                backoff_multiplier: 3.0,
                max_delay_secs: 10.0,
            }
            .policy();

            assert_eq!(policy.max_attempts, 4);
            assert_eq!(policy.initial_delay, Duration::from_millis(1500));
            assert_eq!(policy.backoff_multiplier, 3.0);
            assert_eq!(policy.max_delay, Duration::from_secs(10));
        }

        #[test]
        fn negative_delays_become_zero() {
            let policy = RetryConfig {
                delay_secs: -1.0,
                ..RetryConfig::default()
            }
            .policy();
            assert_eq!(policy.initial_delay, Duration::ZERO);
        }
    }
}
