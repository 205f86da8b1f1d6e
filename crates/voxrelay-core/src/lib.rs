pub mod cancel;
pub mod config;
pub mod error;
pub mod types;

pub use cancel::CancelToken;
pub use config::AppConfig;
pub use error::{
    ConfigError, DeliveryFailure, DestinationError, EngineError, LookupError, PipelineError,
    ResolveError, StreamError,
};
pub use types::{
    AudioFormat, AudioUnit, ChunkBatch, ChunkEncoding, DeliveryTarget, RawChunk,
    ResolutionPolicy, StreamPosition, SynthesizedAudio, TargetRecord, TranscriptAlternative,
    TranscriptEvent, TranscriptResult,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_position_round_trips_token() {
        let position = StreamPosition::new("shard-0001");
        assert_eq!(position.as_str(), "shard-0001");
        assert_eq!(position.to_string(), "shard-0001");
    }

    #[test]
    fn test_transcript_event_single() {
        let event = TranscriptEvent::single("hello", true);
        assert_eq!(event.results.len(), 1);
        assert!(event.results[0].is_final);
        assert_eq!(
            event.results[0].alternatives[0].transcript.as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn test_delivery_target_display() {
        let target = DeliveryTarget::new("abc123=");
        assert_eq!(target.to_string(), "abc123=");
    }

    #[test]
    fn test_audio_format_display() {
        assert_eq!(AudioFormat::Mp3.to_string(), "mp3");
        assert_eq!(AudioFormat::Pcm.to_string(), "pcm");
    }

    #[test]
    fn test_chunk_encoding_defaults_to_base64() {
        assert_eq!(ChunkEncoding::default(), ChunkEncoding::Base64);
    }
}
