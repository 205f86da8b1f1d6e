use crate::pipeline::UtterancePipeline;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use voxrelay_core::TranscriptEvent;

/// Counters shared between the relay task and its owner.
#[derive(Debug, Default)]
pub struct RelayStats {
    events: AtomicUsize,
    dispatched: AtomicUsize,
}

impl RelayStats {
    pub fn events(&self) -> usize {
        self.events.load(Ordering::Relaxed)
    }

    /// Events that carried a finished utterance and started a pipeline run.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }
}

/// Consumes transcript events and starts one pipeline run per utterance.
///
/// The relay ends when the transcript channel closes, after every run it
/// started has finished.
pub struct RelayHost {
    pipeline: Arc<UtterancePipeline>,
    transcript_rx: Option<mpsc::UnboundedReceiver<TranscriptEvent>>,
    stats: Arc<RelayStats>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl RelayHost {
    pub fn new(
        pipeline: Arc<UtterancePipeline>,
        transcript_rx: mpsc::UnboundedReceiver<TranscriptEvent>,
    ) -> Self {
        Self {
            pipeline,
            transcript_rx: Some(transcript_rx),
            stats: Arc::new(RelayStats::default()),
            task_handle: None,
        }
    }

    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    pub fn start(&mut self) {
        let Some(mut rx) = self.transcript_rx.take() else {
            tracing::warn!("relay already started");
            return;
        };
        let pipeline = Arc::clone(&self.pipeline);
        let stats = Arc::clone(&self.stats);

        let handle = tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        stats.events.fetch_add(1, Ordering::Relaxed);
                        if let Some(run) = pipeline.process(&event) {
                            stats.dispatched.fetch_add(1, Ordering::Relaxed);
                            in_flight.spawn(async move {
                                if let Err(e) = run.await {
                                    tracing::error!("pipeline run did not complete: {e}");
                                }
                            });
                        }
                    }
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                }
            }

            if !in_flight.is_empty() {
                tracing::debug!(in_flight = in_flight.len(), "waiting for pipeline runs");
            }
            while in_flight.join_next().await.is_some() {}
        });
        self.task_handle = Some(handle);
    }

    /// Wait for the transcript channel to close and all runs to finish.
    ///
    /// Cancel-safe: if the returned future is dropped early, a later call
    /// still waits for the relay task.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.task_handle.as_mut() {
            let _ = handle.await;
            self.task_handle = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use voxrelay_core::{
        DeliveryTarget, DestinationError, EngineError, LookupError, ResolutionPolicy,
        TargetRecord,
    };
    use voxrelay_destination::{
        AudioPayload, ConnectionResolver, Delivery, RetryPolicy, Sink, TargetLookup,
    };
    use voxrelay_engine::{EchoTranslator, NullSynthesizer, Translator};

    struct OneTarget;

    #[async_trait]
    impl TargetLookup for OneTarget {
        fn name(&self) -> &str {
            "one"
        }

        async fn lookup(&self, _: &ResolutionPolicy) -> Result<Vec<TargetRecord>, LookupError> {
            Ok(vec![TargetRecord {
                communicator: Some("AGENT".into()),
                connection_id: Some("conn-1".into()),
            }])
        }
    }

    /// Delays every delivery so runs are still in flight when the channel closes.
    #[derive(Default)]
    struct SlowSink {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Sink for SlowSink {
        fn name(&self) -> &str {
            "slow"
        }

        async fn initialize(&mut self, _config: toml::Value) -> Result<(), DestinationError> {
            Ok(())
        }

        async fn deliver(
            &self,
            _target: &DeliveryTarget,
            payload: &AudioPayload,
        ) -> Result<(), DestinationError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.delivered
                .lock()
                .unwrap()
                .push(payload.audio_data.clone());
            Ok(())
        }

        fn is_healthy(&self) -> bool {
            true
        }

        async fn shutdown(&self) -> Result<(), DestinationError> {
            Ok(())
        }
    }

    /// Panics on "boom", echoes everything else.
    struct PanickingTranslator;

    #[async_trait]
    impl Translator for PanickingTranslator {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn initialize(&mut self, _config: toml::Value) -> Result<(), EngineError> {
            Ok(())
        }

        async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, EngineError> {
            if text == "boom" {
                panic!("translator blew up");
            }
            Ok(text.to_string())
        }
    }

    fn pipeline(sink: Arc<SlowSink>) -> Arc<UtterancePipeline> {
        pipeline_with(Arc::new(EchoTranslator::new()), sink)
    }

    fn pipeline_with(
        translator: Arc<dyn Translator>,
        sink: Arc<SlowSink>,
    ) -> Arc<UtterancePipeline> {
        Arc::new(UtterancePipeline::new(
            translator,
            Arc::new(NullSynthesizer::new()),
            ConnectionResolver::new(
                Arc::new(OneTarget),
                ResolutionPolicy::SingleTarget {
                    key: "AGENT".into(),
                },
                RetryPolicy::default(),
            ),
            Delivery::new(sink),
            Default::default(),
        ))
    }

    #[tokio::test]
    async fn test_relay_waits_for_in_flight_runs() {
        let sink = Arc::new(SlowSink::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let mut relay = RelayHost::new(pipeline(sink.clone()), rx);
        let stats = relay.stats();
        relay.start();

        tx.send(TranscriptEvent::single("one", true)).unwrap();
        tx.send(TranscriptEvent::single("partial", false)).unwrap();
        tx.send(TranscriptEvent::single("two", true)).unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(2), relay.shutdown())
            .await
            .expect("relay did not finish");

        assert_eq!(stats.events(), 3);
        assert_eq!(stats.dispatched(), 2);
        let mut delivered = sink.delivered.lock().unwrap().clone();
        delivered.sort();
        // base64("one"), base64("two")
        assert_eq!(delivered, vec!["b25l", "dHdv"]);
    }

    #[tokio::test]
    async fn test_interrupted_shutdown_can_be_resumed() {
        let sink = Arc::new(SlowSink::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let mut relay = RelayHost::new(pipeline(sink.clone()), rx);
        relay.start();

        tx.send(TranscriptEvent::single("one", true)).unwrap();
        let interrupted =
            tokio::time::timeout(Duration::from_millis(10), relay.shutdown()).await;
        assert!(interrupted.is_err());

        drop(tx);
        tokio::time::timeout(Duration::from_secs(2), relay.shutdown())
            .await
            .expect("relay did not finish");
        assert_eq!(sink.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_relay_with_closed_channel_finishes() {
        let sink = Arc::new(SlowSink::default());
        let (tx, rx) = mpsc::unbounded_channel::<TranscriptEvent>();
        drop(tx);
        let mut relay = RelayHost::new(pipeline(sink), rx);
        relay.start();

        tokio::time::timeout(Duration::from_secs(2), relay.shutdown())
            .await
            .expect("relay did not finish");
        assert_eq!(relay.stats().events(), 0);
    }

    #[tokio::test]
    async fn test_panicked_run_does_not_stop_relay() {
        let sink = Arc::new(SlowSink::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = pipeline_with(Arc::new(PanickingTranslator), sink.clone());
        let mut relay = RelayHost::new(pipeline, rx);
        let stats = relay.stats();
        relay.start();

        tx.send(TranscriptEvent::single("boom", true)).unwrap();
        tx.send(TranscriptEvent::single("two", true)).unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(2), relay.shutdown())
            .await
            .expect("relay did not finish");

        assert_eq!(stats.dispatched(), 2);
        assert_eq!(sink.delivered.lock().unwrap().clone(), vec!["dHdv"]);
    }
}
