use async_trait::async_trait;
use voxrelay_core::{ChunkBatch, StreamError, StreamPosition};

/// Adapter over a cursor-based record source.
///
/// Given a position, returns the chunks stored there and the position to
/// read from next. `limit` is a size hint; implementations may return fewer
/// chunks (including none) or, if the source ignores hints, more.
#[async_trait]
pub trait CursorFetcher: Send + Sync {
    /// Returns the fetcher's source name (e.g. `"file"`).
    fn name(&self) -> &str;
    /// Fetch the batch at `position`.
    async fn fetch(
        &self,
        position: &StreamPosition,
        limit: usize,
    ) -> Result<ChunkBatch, StreamError>;
}
