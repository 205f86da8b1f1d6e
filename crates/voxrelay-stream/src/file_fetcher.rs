use crate::fetcher::CursorFetcher;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use voxrelay_core::config::StartPosition;
use voxrelay_core::{ChunkBatch, RawChunk, StreamError, StreamPosition};

/// Record source backed by a local file, one record per non-empty line.
///
/// Position tokens are the decimal index of the next record to read. The
/// file is re-read on every fetch so records appended by a producer become
/// visible when `follow` is set.
pub struct FileFetcher {
    path: PathBuf,
    follow: bool,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>, follow: bool) -> Self {
        Self {
            path: path.into(),
            follow,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a start position the way shard iterators do: the first record
    /// for `TrimHorizon`, just past the last current record for `Latest`.
    pub async fn start_position(&self, start: StartPosition) -> Result<StreamPosition, StreamError> {
        let index = match start {
            StartPosition::TrimHorizon => 0,
            StartPosition::Latest => self.read_records().await?.len(),
        };
        Ok(StreamPosition::new(index.to_string()))
    }

    async fn read_records(&self) -> Result<Vec<RawChunk>, StreamError> {
        let content = tokio::fs::read(&self.path).await.map_err(|e| {
            StreamError::FetchFailed(format!("failed to read {}: {e}", self.path.display()))
        })?;
        Ok(content
            .split(|b| *b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(RawChunk::new)
            .collect())
    }
}

#[async_trait]
impl CursorFetcher for FileFetcher {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(
        &self,
        position: &StreamPosition,
        limit: usize,
    ) -> Result<ChunkBatch, StreamError> {
        let start: usize = position.as_str().parse().map_err(|_| {
            StreamError::FetchFailed(format!("invalid position token: {position}"))
        })?;

        let records = self.read_records().await?;
        if start > records.len() {
            return Err(StreamError::FetchFailed(format!(
                "position {start} is past the end of {} ({} records)",
                self.path.display(),
                records.len()
            )));
        }

        let end = start.saturating_add(limit.max(1)).min(records.len());
        let chunks = records[start..end].to_vec();
        let next_position = if end == records.len() && !self.follow {
            None
        } else {
            Some(StreamPosition::new(end.to_string()))
        };

        tracing::trace!(
            path = %self.path.display(),
            start,
            end,
            "read records"
        );
        Ok(ChunkBatch {
            chunks,
            next_position,
        })
    }
}
