use async_trait::async_trait;
use voxrelay_core::EngineError;

#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;
    async fn initialize(&mut self, config: toml::Value) -> Result<(), EngineError>;
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, EngineError>;
}

/// Returns the input unchanged when both languages match, otherwise tags it
/// with the target language.
#[derive(Debug, Default)]
pub struct EchoTranslator;

impl EchoTranslator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Translator for EchoTranslator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn initialize(&mut self, _config: toml::Value) -> Result<(), EngineError> {
        Ok(())
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, EngineError> {
        if text.is_empty() {
            return Err(EngineError::ProcessingFailed("nothing to translate".into()));
        }
        if source == target {
            Ok(text.to_string())
        } else {
            Ok(format!("[{target}] {text}"))
        }
    }
}
