use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use voxrelay_core::{AudioFormat, EngineError, SynthesizedAudio};

#[async_trait]
pub trait Synthesizer: Send + Sync {
    fn name(&self) -> &str;
    async fn initialize(&mut self, config: toml::Value) -> Result<(), EngineError>;
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        language_code: &str,
    ) -> Result<SynthesizedAudio, EngineError>;
}

/// Produces placeholder "audio": the UTF-8 bytes of the text.
///
/// Output format comes from the optional `format` key (`"mp3"` or `"pcm"`,
/// default `"mp3"`).
pub struct NullSynthesizer {
    format: AudioFormat,
    synth_count: AtomicUsize,
}

impl NullSynthesizer {
    pub fn new() -> Self {
        Self {
            format: AudioFormat::Mp3,
            synth_count: AtomicUsize::new(0),
        }
    }

    pub fn synth_count(&self) -> usize {
        self.synth_count.load(Ordering::Relaxed)
    }
}

impl Default for NullSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Synthesizer for NullSynthesizer {
    fn name(&self) -> &str {
        "null"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), EngineError> {
        self.format = match config.get("format").and_then(|v| v.as_str()) {
            None | Some("mp3") => AudioFormat::Mp3,
            Some("pcm") => AudioFormat::Pcm,
            Some(other) => {
                return Err(EngineError::InitializationFailed(format!(
                    "unsupported output format: {other}"
                )))
            }
        };
        Ok(())
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        language_code: &str,
    ) -> Result<SynthesizedAudio, EngineError> {
        if text.is_empty() {
            return Err(EngineError::ProcessingFailed("nothing to synthesize".into()));
        }
        let count = self.synth_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(voice, language_code, "NullSynthesizer request #{count}");
        Ok(SynthesizedAudio {
            bytes: text.as_bytes().to_vec(),
            format: self.format,
        })
    }
}
