use crate::sink::{AudioPayload, Sink};
use std::sync::Arc;
use voxrelay_core::{DeliveryFailure, DeliveryTarget, SynthesizedAudio};

/// Per-target outcome of one fan-out.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: Vec<DeliveryTarget>,
    pub failed: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Pushes synthesized audio to resolved targets through a sink.
pub struct Delivery {
    sink: Arc<dyn Sink>,
}

impl Delivery {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self { sink }
    }

    /// Deliver `audio` to every target in order. A failed target is logged and
    /// reported; it never stops delivery to the rest.
    pub async fn deliver(
        &self,
        targets: &[DeliveryTarget],
        audio: &SynthesizedAudio,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if targets.is_empty() {
            tracing::debug!(sink = self.sink.name(), "no targets to deliver to");
            return report;
        }

        let payload = AudioPayload::from_audio(audio);
        for target in targets {
            match self.sink.deliver(target, &payload).await {
                Ok(()) => {
                    tracing::debug!(
                        connection_id = %target,
                        sink = self.sink.name(),
                        bytes = audio.bytes.len(),
                        "delivered audio"
                    );
                    report.delivered.push(target.clone());
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %target,
                        sink = self.sink.name(),
                        "delivery failed: {e}"
                    );
                    report.failed.push(DeliveryFailure {
                        target: target.connection_id.clone(),
                        error: e,
                    });
                }
            }
        }
        report
    }
}
