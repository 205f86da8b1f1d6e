use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the demand bridge. Every variant is terminal for the
/// bridge's current run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("demand must be positive, got {0}")]
    InvalidDemand(i64),

    #[error("failed to fetch chunks: {0}")]
    FetchFailed(String),

    #[error("failed to decode chunk: {0}")]
    DecodeFailed(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine initialization failed: {0}")]
    InitializationFailed(String),

    #[error("engine processing failed: {0}")]
    ProcessingFailed(String),

    #[error("engine not found: {0}")]
    EngineNotFound(String),
}

/// Outcome of a single connection lookup that did not yield usable targets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("lookup failed: {0}")]
    Transient(String),

    #[error("no connection registered for key: {0}")]
    NotFound(String),

    #[error("malformed connection record: {0}")]
    Malformed(String),

    #[error("lookup rejected: {0}")]
    Rejected(String),
}

impl LookupError {
    /// Only `Rejected` is final; everything else may clear up on a later attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LookupError::Rejected(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("target resolution exhausted after {attempts} attempt(s): {last_error}")]
    ResolutionExhausted {
        attempts: u32,
        last_error: LookupError,
    },

    #[error("target resolution rejected: {0}")]
    Rejected(LookupError),

    #[error("target resolution cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("destination initialization failed: {0}")]
    InitializationFailed(String),

    #[error("failed to deliver payload: {0}")]
    SendFailed(String),

    #[error("destination not found: {0}")]
    NotFound(String),

    #[error("destination connection lost: {0}")]
    ConnectionLost(String),
}

/// A delivery that failed for one target. Other targets are unaffected.
#[derive(Debug, Error)]
#[error("delivery to {target} failed: {error}")]
pub struct DeliveryFailure {
    pub target: String,
    #[source]
    pub error: DestinationError,
}

/// Errors that abort a single utterance's pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("translation failed: {0}")]
    TranslationFailed(#[source] EngineError),

    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(#[source] EngineError),

    #[error(transparent)]
    Resolution(#[from] ResolveError),
}
