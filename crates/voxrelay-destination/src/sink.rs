use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use voxrelay_core::{DeliveryTarget, DestinationError, SynthesizedAudio};

/// Wire body pushed to every connection: `{"audio_data": "<base64>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioPayload {
    pub audio_data: String,
}

impl AudioPayload {
    pub fn from_audio(audio: &SynthesizedAudio) -> Self {
        Self {
            audio_data: STANDARD.encode(&audio.bytes),
        }
    }
}

/// Push channel to connected clients, addressed by connection id.
///
/// Implementations are created through [`SinkRegistry`](crate::SinkRegistry)
/// and initialised with the `[delivery]` config table.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Plugin name, e.g. `"file"`.
    fn name(&self) -> &str;
    async fn initialize(&mut self, config: toml::Value) -> Result<(), DestinationError>;
    /// Push one payload to one connection. No retries.
    async fn deliver(
        &self,
        target: &DeliveryTarget,
        payload: &AudioPayload,
    ) -> Result<(), DestinationError>;
    fn is_healthy(&self) -> bool;
    async fn shutdown(&self) -> Result<(), DestinationError>;
}
