pub mod host;
pub mod null_transcriber;
pub mod registry;
pub mod synthesizer;
pub mod transcriber;
pub mod translator;

pub use host::TranscriptionHost;
pub use null_transcriber::NullTranscriber;
pub use registry::EngineRegistry;
pub use synthesizer::{NullSynthesizer, Synthesizer};
pub use transcriber::Transcriber;
pub use translator::{EchoTranslator, Translator};
