use voxrelay_core::TranscriptEvent;

/// Text of a finished utterance, or `""` when the event carries none.
///
/// Only the first result and its first alternative are considered. Partial
/// results yield `""`.
pub fn extract_transcript(event: &TranscriptEvent) -> String {
    event
        .results
        .first()
        .filter(|result| result.is_final)
        .and_then(|result| result.alternatives.first())
        .and_then(|alt| alt.transcript.as_deref())
        .unwrap_or_default()
        .to_string()
}
