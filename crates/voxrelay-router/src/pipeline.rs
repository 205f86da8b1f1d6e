use crate::transcript::extract_transcript;
use std::sync::Arc;
use tokio::task::JoinHandle;
use voxrelay_core::{AppConfig, PipelineError, TranscriptEvent};
use voxrelay_destination::{ConnectionResolver, Delivery, DeliveryReport};
use voxrelay_engine::{Synthesizer, Translator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source_language: String,
    pub target_language: String,
    pub voice: String,
    /// Language code passed to the synthesizer.
    pub language_code: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "en".to_string(),
            voice: "Danielle".to_string(),
            language_code: "en-US".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            source_language: config.translate.source_language.clone(),
            target_language: config.translate.target_language.clone(),
            voice: config.synthesis.voice.clone(),
            language_code: config.synthesis.language_code.clone(),
        }
    }
}

/// Translate, synthesize, resolve and deliver one utterance.
///
/// Runs hold no shared mutable state, so any number may be in flight at once.
pub struct UtterancePipeline {
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn Synthesizer>,
    resolver: ConnectionResolver,
    delivery: Delivery,
    config: PipelineConfig,
}

impl UtterancePipeline {
    pub fn new(
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn Synthesizer>,
        resolver: ConnectionResolver,
        delivery: Delivery,
        config: PipelineConfig,
    ) -> Self {
        Self {
            translator,
            synthesizer,
            resolver,
            delivery,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, utterance: &str) -> Result<DeliveryReport, PipelineError> {
        let translated = self
            .translator
            .translate(
                utterance,
                &self.config.source_language,
                &self.config.target_language,
            )
            .await
            .map_err(PipelineError::TranslationFailed)?;
        tracing::debug!(
            translator = self.translator.name(),
            "translated utterance: {translated}"
        );

        let audio = self
            .synthesizer
            .synthesize(&translated, &self.config.voice, &self.config.language_code)
            .await
            .map_err(PipelineError::SynthesisFailed)?;
        tracing::debug!(
            synthesizer = self.synthesizer.name(),
            format = %audio.format,
            bytes = audio.bytes.len(),
            "synthesized utterance"
        );

        let targets = self.resolver.resolve().await?;
        Ok(self.delivery.deliver(&targets, &audio).await)
    }

    /// Start an independent run for a transcript event.
    ///
    /// Returns `None` when the event carries no finished utterance. The run's
    /// outcome is only logged; a failure never affects other runs.
    pub fn process(self: &Arc<Self>, event: &TranscriptEvent) -> Option<JoinHandle<()>> {
        let utterance = extract_transcript(event);
        if utterance.is_empty() {
            tracing::trace!("skipping event without a final transcript");
            return None;
        }

        let pipeline = Arc::clone(self);
        Some(tokio::spawn(async move {
            match pipeline.run(&utterance).await {
                Ok(report) => {
                    if report.all_delivered() {
                        tracing::info!(
                            delivered = report.delivered.len(),
                            "relayed utterance: {utterance}"
                        );
                    } else {
                        tracing::warn!(
                            delivered = report.delivered.len(),
                            failed = report.failed.len(),
                            "relayed utterance with failures: {utterance}"
                        );
                    }
                }
                Err(e) => tracing::error!("utterance pipeline failed: {e}"),
            }
        }))
    }
}
