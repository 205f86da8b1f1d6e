use serde::Deserialize;
use std::fmt;

/// Opaque token locating a read point in the source stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamPosition(String);

impl StreamPosition {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub data: Vec<u8>,
}

impl RawChunk {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

/// One fetch result. A `None` next position marks the end of the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkBatch {
    pub chunks: Vec<RawChunk>,
    pub next_position: Option<StreamPosition>,
}

/// How the bytes of a fetched record are turned into audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkEncoding {
    /// Record bytes are the audio.
    Raw,
    /// Record bytes are base64 text encoding the audio.
    #[default]
    Base64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUnit {
    pub bytes: Vec<u8>,
}

/// One notification from the transcription feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptEvent {
    #[serde(default)]
    pub results: Vec<TranscriptResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptResult {
    #[serde(default)]
    pub is_final: bool,

    #[serde(default)]
    pub alternatives: Vec<TranscriptAlternative>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptAlternative {
    #[serde(default)]
    pub transcript: Option<String>,
}

impl TranscriptEvent {
    /// Event with a single result holding a single alternative.
    pub fn single(text: &str, is_final: bool) -> Self {
        Self {
            results: vec![TranscriptResult {
                is_final,
                alternatives: vec![TranscriptAlternative {
                    transcript: Some(text.to_string()),
                }],
            }],
        }
    }
}

/// How the live delivery targets for an utterance are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Exactly one target registered under `key`.
    SingleTarget { key: String },
    /// Every currently registered target. An empty set is valid.
    Broadcast,
}

/// A raw row from the connection registry, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TargetRecord {
    #[serde(default)]
    pub communicator: Option<String>,

    #[serde(default, rename = "connectionId")]
    pub connection_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryTarget {
    pub connection_id: String,
}

impl DeliveryTarget {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
        }
    }
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connection_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Pcm,
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFormat::Mp3 => f.write_str("mp3"),
            AudioFormat::Pcm => f.write_str("pcm"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}
