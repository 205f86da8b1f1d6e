use crate::error::ConfigError;
use crate::types::{ChunkEncoding, ResolutionPolicy};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub transcribe: TranscribeConfig,

    #[serde(default)]
    pub translate: TranslateConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

/// Where in the record file the bridge starts reading.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StartPosition {
    TrimHorizon,
    #[default]
    Latest,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    #[serde(default = "default_stream_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub start: StartPosition,

    #[serde(default)]
    pub follow: bool,

    #[serde(default)]
    pub encoding: ChunkEncoding,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    #[serde(default = "default_initial_demand")]
    pub initial_demand: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            path: default_stream_path(),
            start: StartPosition::default(),
            follow: false,
            encoding: ChunkEncoding::default(),
            max_batch_size: default_max_batch_size(),
            idle_poll_ms: default_idle_poll_ms(),
            initial_demand: default_initial_demand(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscribeConfig {
    #[serde(default = "default_transcriber")]
    pub engine: String,

    #[serde(default = "default_voice_language")]
    pub language_code: String,

    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            engine: default_transcriber(),
            language_code: default_voice_language(),
            extra: toml::Table::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranslateConfig {
    #[serde(default = "default_translator")]
    pub engine: String,

    #[serde(default = "default_text_language")]
    pub source_language: String,

    #[serde(default = "default_text_language")]
    pub target_language: String,

    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            engine: default_translator(),
            source_language: default_text_language(),
            target_language: default_text_language(),
            extra: toml::Table::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SynthesisConfig {
    #[serde(default = "default_synthesizer")]
    pub engine: String,

    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_voice_language")]
    pub language_code: String,

    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            engine: default_synthesizer(),
            voice: default_voice(),
            language_code: default_voice_language(),
            extra: toml::Table::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Single,
    Broadcast,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    #[serde(default)]
    pub policy: PolicyKind,

    #[serde(default = "default_lookup_key")]
    pub key: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            key: default_lookup_key(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            registry_path: default_registry_path(),
        }
    }
}

impl ResolverConfig {
    pub fn resolution_policy(&self) -> ResolutionPolicy {
        match self.policy {
            PolicyKind::Single => ResolutionPolicy::SingleTarget {
                key: self.key.clone(),
            },
            PolicyKind::Broadcast => ResolutionPolicy::Broadcast,
        }
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeliveryConfig {
    #[serde(default = "default_sink")]
    pub sink: String,

    /// Sink-specific keys, handed to the sink's `initialize`.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            sink: default_sink(),
            extra: toml::Table::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_run_timeout_secs() -> u64 {
    890
}

fn default_stream_path() -> PathBuf {
    PathBuf::from("records.txt")
}

fn default_max_batch_size() -> usize {
    100
}

fn default_idle_poll_ms() -> u64 {
    1000
}

fn default_initial_demand() -> u32 {
    8
}

fn default_transcriber() -> String {
    "null".to_string()
}

fn default_translator() -> String {
    "echo".to_string()
}

fn default_synthesizer() -> String {
    "null".to_string()
}

fn default_text_language() -> String {
    "en".to_string()
}

fn default_voice_language() -> String {
    "en-US".to_string()
}

fn default_voice() -> String {
    "Danielle".to_string()
}

fn default_lookup_key() -> String {
    "AGENT_RECEIVER".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("connections.json")
}

fn default_sink() -> String {
    "file".to_string()
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid"))
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = input.to_string();

    for cap in env_var_pattern().captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => result = result.replace(&cap[0], &val),
            Err(_) => return Err(ConfigError::EnvVarNotFound(var_name.to_string())),
        }
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "stream.max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.stream.initial_demand == 0 {
            return Err(ConfigError::Invalid(
                "stream.initial_demand must be at least 1".to_string(),
            ));
        }
        if self.resolver.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "resolver.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.resolver.policy == PolicyKind::Single && self.resolver.key.is_empty() {
            return Err(ConfigError::Invalid(
                "resolver.key is required for the single policy".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_valid_toml() {
        let toml_str = r#"
[general]
log_level = "debug"
run_timeout_secs = 60

[stream]
path = "/var/spool/records.txt"
start = "trim_horizon"
follow = true
encoding = "raw"
max_batch_size = 25
idle_poll_ms = 250
initial_demand = 4

[translate]
source_language = "en"
target_language = "es"

[synthesis]
voice = "Lucia"
language_code = "es-ES"

[resolver]
policy = "broadcast"
max_attempts = 5
initial_backoff_ms = 200
registry_path = "/tmp/connections.json"

[delivery]
sink = "file"
path = "/tmp/out.jsonl"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.run_timeout_secs, 60);
        assert_eq!(config.stream.path, PathBuf::from("/var/spool/records.txt"));
        assert_eq!(config.stream.start, StartPosition::TrimHorizon);
        assert!(config.stream.follow);
        assert_eq!(config.stream.encoding, ChunkEncoding::Raw);
        assert_eq!(config.stream.max_batch_size, 25);
        assert_eq!(config.stream.idle_poll_ms, 250);
        assert_eq!(config.stream.initial_demand, 4);
        assert_eq!(config.translate.target_language, "es");
        assert_eq!(config.synthesis.voice, "Lucia");
        assert_eq!(config.synthesis.language_code, "es-ES");
        assert_eq!(config.resolver.policy, PolicyKind::Broadcast);
        assert_eq!(config.resolver.max_attempts, 5);
        assert_eq!(config.resolver.initial_backoff(), Duration::from_millis(200));
        assert_eq!(config.delivery.sink, "file");
        assert_eq!(
            config.delivery.extra.get("path").and_then(|v| v.as_str()),
            Some("/tmp/out.jsonl")
        );
    }

    #[test]
    fn test_config_default_values() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.run_timeout_secs, 890);
        assert_eq!(config.stream.start, StartPosition::Latest);
        assert!(!config.stream.follow);
        assert_eq!(config.stream.encoding, ChunkEncoding::Base64);
        assert_eq!(config.stream.max_batch_size, 100);
        assert_eq!(config.stream.initial_demand, 8);
        assert_eq!(config.transcribe.engine, "null");
        assert_eq!(config.transcribe.language_code, "en-US");
        assert_eq!(config.translate.engine, "echo");
        assert_eq!(config.translate.source_language, "en");
        assert_eq!(config.translate.target_language, "en");
        assert_eq!(config.synthesis.engine, "null");
        assert_eq!(config.synthesis.voice, "Danielle");
        assert_eq!(config.synthesis.language_code, "en-US");
        assert_eq!(config.resolver.policy, PolicyKind::Single);
        assert_eq!(config.resolver.key, "AGENT_RECEIVER");
        assert_eq!(config.resolver.max_attempts, 3);
        assert_eq!(config.resolver.initial_backoff(), Duration::from_millis(1000));
        assert_eq!(config.delivery.sink, "file");
        assert!(config.delivery.extra.is_empty());
    }

    #[test]
    fn test_config_resolution_policy_single() {
        let config = AppConfig::from_toml_str(
            r#"
[resolver]
policy = "single"
key = "AGENT"
"#,
        )
        .unwrap();
        assert_eq!(
            config.resolver.resolution_policy(),
            ResolutionPolicy::SingleTarget {
                key: "AGENT".to_string()
            }
        );
    }

    #[test]
    fn test_config_resolution_policy_broadcast() {
        let config = AppConfig::from_toml_str("[resolver]\npolicy = \"broadcast\"\n").unwrap();
        assert_eq!(
            config.resolver.resolution_policy(),
            ResolutionPolicy::Broadcast
        );
    }

    #[test]
    fn test_config_env_var_interpolation() {
        std::env::set_var("VOXRELAY_TEST_VOICE", "Lucia");
        let toml_str = r#"
[synthesis]
voice = "${VOXRELAY_TEST_VOICE}"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.synthesis.voice, "Lucia");
        std::env::remove_var("VOXRELAY_TEST_VOICE");
    }

    #[test]
    fn test_config_missing_env_var_error() {
        let toml_str = r#"
[general]
log_level = "${DEFINITELY_DOES_NOT_EXIST_12345}"
"#;
        let err = AppConfig::from_toml_str(toml_str).unwrap_err();
        assert!(err.to_string().contains("DEFINITELY_DOES_NOT_EXIST_12345"));
    }

    #[test]
    fn test_config_invalid_toml_error() {
        let result = AppConfig::from_toml_str("this is not valid toml [[[");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_config_unknown_encoding_rejected() {
        let result = AppConfig::from_toml_str("[stream]\nencoding = \"hex\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_zero_attempts_rejected() {
        let result = AppConfig::from_toml_str("[resolver]\nmax_attempts = 0\n");
        match result {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("max_attempts")),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_config_zero_batch_size_rejected() {
        let result = AppConfig::from_toml_str("[stream]\nmax_batch_size = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_empty_key_rejected_for_single_policy() {
        let result = AppConfig::from_toml_str("[resolver]\nkey = \"\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = std::env::temp_dir().join("voxrelay_test_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        std::fs::write(
            &path,
            r#"
[general]
log_level = "warn"

[resolver]
key = "SUPERVISOR"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.resolver.key, "SUPERVISOR");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_load_from_file_not_found() {
        let result = AppConfig::load_from_file(Path::new("/nonexistent/path.toml"));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("failed to read config file"));
    }

    #[test]
    fn test_config_engine_extra_fields_captured() {
        let toml_str = r#"
[translate]
engine = "echo"
tag = true
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(
            config.translate.extra.get("tag").and_then(|v| v.as_bool()),
            Some(true)
        );
    }
}
