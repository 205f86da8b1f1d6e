use async_trait::async_trait;
use tokio::sync::mpsc;
use voxrelay_core::{AudioUnit, EngineError, TranscriptEvent};

/// Streaming speech-to-text engine.
///
/// Audio is pushed with `feed_audio`; transcript events come back on the
/// sender installed with `set_result_sender`. `shutdown` must release that
/// sender so the receiving side observes the end of the feed.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;
    async fn initialize(&mut self, config: toml::Value) -> Result<(), EngineError>;
    async fn feed_audio(&self, unit: AudioUnit) -> Result<(), EngineError>;
    fn set_result_sender(&mut self, sender: mpsc::UnboundedSender<TranscriptEvent>);
    async fn shutdown(&self) -> Result<(), EngineError>;
}
