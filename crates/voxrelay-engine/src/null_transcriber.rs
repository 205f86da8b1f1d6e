use crate::transcriber::Transcriber;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use voxrelay_core::{AudioUnit, EngineError, TranscriptEvent};

/// Emits one final transcript per audio unit describing its size.
pub struct NullTranscriber {
    feed_count: AtomicUsize,
    result_sender: Mutex<Option<mpsc::UnboundedSender<TranscriptEvent>>>,
}

impl NullTranscriber {
    pub fn new() -> Self {
        Self {
            feed_count: AtomicUsize::new(0),
            result_sender: Mutex::new(None),
        }
    }

    pub fn feed_count(&self) -> usize {
        self.feed_count.load(Ordering::Relaxed)
    }
}

impl Default for NullTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for NullTranscriber {
    fn name(&self) -> &str {
        "null"
    }

    async fn initialize(&mut self, _config: toml::Value) -> Result<(), EngineError> {
        Ok(())
    }

    async fn feed_audio(&self, unit: AudioUnit) -> Result<(), EngineError> {
        let count = self.feed_count.fetch_add(1, Ordering::Relaxed) + 1;
        let text = format!("[null] {} bytes", unit.bytes.len());
        let sender = self
            .result_sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = sender.as_ref() {
            let _ = tx.send(TranscriptEvent::single(&text, true));
        }
        tracing::trace!("NullTranscriber fed unit #{count}, {} bytes", unit.bytes.len());
        Ok(())
    }

    fn set_result_sender(&mut self, sender: mpsc::UnboundedSender<TranscriptEvent>) {
        *self
            .result_sender
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = Some(sender);
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        self.result_sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}
