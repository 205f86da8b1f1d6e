use crate::null_transcriber::NullTranscriber;
use crate::synthesizer::{NullSynthesizer, Synthesizer};
use crate::transcriber::Transcriber;
use crate::translator::{EchoTranslator, Translator};
use std::collections::HashMap;
use voxrelay_core::EngineError;

/// Creates engines by name. Built-ins are registered on construction.
pub struct EngineRegistry {
    transcribers: HashMap<String, fn() -> Box<dyn Transcriber>>,
    translators: HashMap<String, fn() -> Box<dyn Translator>>,
    synthesizers: HashMap<String, fn() -> Box<dyn Synthesizer>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            transcribers: HashMap::new(),
            translators: HashMap::new(),
            synthesizers: HashMap::new(),
        };
        registry.register_transcriber("null", || Box::new(NullTranscriber::new()));
        registry.register_translator("echo", || Box::new(EchoTranslator::new()));
        registry.register_synthesizer("null", || Box::new(NullSynthesizer::new()));
        registry
    }

    pub fn register_transcriber(&mut self, name: &str, factory: fn() -> Box<dyn Transcriber>) {
        self.transcribers.insert(name.to_string(), factory);
    }

    pub fn register_translator(&mut self, name: &str, factory: fn() -> Box<dyn Translator>) {
        self.translators.insert(name.to_string(), factory);
    }

    pub fn register_synthesizer(&mut self, name: &str, factory: fn() -> Box<dyn Synthesizer>) {
        self.synthesizers.insert(name.to_string(), factory);
    }

    pub fn create_transcriber(&self, name: &str) -> Result<Box<dyn Transcriber>, EngineError> {
        self.transcribers
            .get(name)
            .map(|f| f())
            .ok_or_else(|| EngineError::EngineNotFound(format!("transcriber '{name}'")))
    }

    pub fn create_translator(&self, name: &str) -> Result<Box<dyn Translator>, EngineError> {
        self.translators
            .get(name)
            .map(|f| f())
            .ok_or_else(|| EngineError::EngineNotFound(format!("translator '{name}'")))
    }

    pub fn create_synthesizer(&self, name: &str) -> Result<Box<dyn Synthesizer>, EngineError> {
        self.synthesizers
            .get(name)
            .map(|f| f())
            .ok_or_else(|| EngineError::EngineNotFound(format!("synthesizer '{name}'")))
    }

    pub fn list_transcribers(&self) -> Vec<&str> {
        self.transcribers.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
