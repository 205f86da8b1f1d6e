use crate::registry::EngineRegistry;
use crate::transcriber::Transcriber;
use tokio::sync::mpsc;
use voxrelay_core::{CancelToken, EngineError, TranscriptEvent};
use voxrelay_stream::{BridgeEvent, DemandBridge};

struct PendingFeed {
    bridge: DemandBridge,
    audio_rx: mpsc::UnboundedReceiver<BridgeEvent>,
    engine: Box<dyn Transcriber>,
    engine_result_rx: mpsc::UnboundedReceiver<TranscriptEvent>,
    initial_demand: u32,
}

/// Drives a transcriber from a demand bridge.
///
/// The host is the bridge's consumer: it opens a window of `initial_demand`
/// units and asks for one more each time a unit has been fed to the engine.
/// Transcript events are forwarded on a single channel that closes once the
/// feed has ended and the engine has flushed.
pub struct TranscriptionHost {
    pending: Option<PendingFeed>,
    transcript_tx: Option<mpsc::UnboundedSender<TranscriptEvent>>,
    transcript_rx: Option<mpsc::UnboundedReceiver<TranscriptEvent>>,
    cancel: CancelToken,
    task_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl TranscriptionHost {
    pub fn new() -> Self {
        Self::with_cancel(CancelToken::new())
    }

    pub fn with_cancel(cancel: CancelToken) -> Self {
        let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();
        Self {
            pending: None,
            transcript_tx: Some(transcript_tx),
            transcript_rx: Some(transcript_rx),
            cancel,
            task_handles: Vec::new(),
        }
    }

    pub fn take_transcript_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<TranscriptEvent>> {
        self.transcript_rx.take()
    }

    pub async fn set_feed(
        &mut self,
        mut bridge: DemandBridge,
        engine_name: &str,
        config: toml::Value,
        registry: &EngineRegistry,
        initial_demand: u32,
    ) -> Result<(), EngineError> {
        if initial_demand == 0 {
            return Err(EngineError::InitializationFailed(
                "initial demand must be positive".into(),
            ));
        }
        let audio_rx = bridge.take_event_receiver().ok_or_else(|| {
            EngineError::InitializationFailed("bridge event receiver already taken".into())
        })?;

        let mut engine = registry.create_transcriber(engine_name)?;
        let (engine_result_tx, engine_result_rx) = mpsc::unbounded_channel();
        engine.set_result_sender(engine_result_tx);
        engine.initialize(config).await?;

        self.pending = Some(PendingFeed {
            bridge,
            audio_rx,
            engine,
            engine_result_rx,
            initial_demand,
        });
        Ok(())
    }

    pub fn start(&mut self) {
        let Some(feed) = self.pending.take() else {
            tracing::warn!("start() called without a feed");
            return;
        };
        let Some(shared_tx) = self.transcript_tx.take() else {
            return;
        };
        let cancel = self.cancel.clone();

        let handle = tokio::spawn(async move {
            let PendingFeed {
                bridge,
                mut audio_rx,
                engine,
                mut engine_result_rx,
                initial_demand,
            } = feed;
            let engine_name = engine.name().to_string();
            let mut feed_open = true;

            if let Err(e) = bridge.request_more(i64::from(initial_demand)) {
                tracing::error!(engine = %engine_name, "failed to open demand window: {e}");
                feed_open = false;
                if let Err(e) = engine.shutdown().await {
                    tracing::warn!(engine = %engine_name, "engine shutdown failed: {e}");
                }
            }

            loop {
                tokio::select! {
                    event = audio_rx.recv(), if feed_open => {
                        match event {
                            Some(BridgeEvent::Audio(unit)) => {
                                if let Err(e) = engine.feed_audio(unit).await {
                                    tracing::error!(engine = %engine_name, "engine feed error: {e}");
                                }
                                if let Err(e) = bridge.request_more(1) {
                                    tracing::warn!(engine = %engine_name, "demand request failed: {e}");
                                }
                            }
                            Some(BridgeEvent::Complete) | None => {
                                tracing::info!(engine = %engine_name, "audio stream complete");
                                feed_open = false;
                                if let Err(e) = engine.shutdown().await {
                                    tracing::warn!(engine = %engine_name, "engine shutdown failed: {e}");
                                }
                            }
                            Some(BridgeEvent::Error(e)) => {
                                tracing::error!(engine = %engine_name, "audio stream failed: {e}");
                                feed_open = false;
                                if let Err(e) = engine.shutdown().await {
                                    tracing::warn!(engine = %engine_name, "engine shutdown failed: {e}");
                                }
                            }
                        }
                    }
                    _ = cancel.cancelled(), if feed_open => {
                        tracing::debug!(engine = %engine_name, "transcription cancelled");
                        feed_open = false;
                        bridge.cancel();
                        if let Err(e) = engine.shutdown().await {
                            tracing::warn!(engine = %engine_name, "engine shutdown failed: {e}");
                        }
                    }
                    result = engine_result_rx.recv() => {
                        match result {
                            Some(event) => {
                                let _ = shared_tx.send(event);
                            }
                            None => break,
                        }
                    }
                }
            }

            bridge.shutdown().await;
        });
        self.task_handles.push(handle);
    }

    /// Stop the feed and wait for the transcription task to drain.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        let handles = std::mem::take(&mut self.task_handles);
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Default for TranscriptionHost {
    fn default() -> Self {
        Self::new()
    }
}
