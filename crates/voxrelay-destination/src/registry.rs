use crate::file_sink::FileSink;
use crate::sink::Sink;
use std::collections::HashMap;
use voxrelay_core::DestinationError;

pub struct SinkRegistry {
    factories: HashMap<String, fn() -> Box<dyn Sink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("file", || Box::new(FileSink::new()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn Sink>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Sink>, DestinationError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| DestinationError::NotFound(name.to_string()))
    }

    pub fn list_sinks(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}
