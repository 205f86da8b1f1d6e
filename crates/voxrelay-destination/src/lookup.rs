use async_trait::async_trait;
use std::path::{Path, PathBuf};
use voxrelay_core::{LookupError, ResolutionPolicy, TargetRecord};

/// Query against the live connection registry.
///
/// `SingleTarget` returns the records registered under the key, `Broadcast`
/// returns every record. Records are returned unvalidated.
#[async_trait]
pub trait TargetLookup: Send + Sync {
    fn name(&self) -> &str;
    async fn lookup(&self, policy: &ResolutionPolicy) -> Result<Vec<TargetRecord>, LookupError>;
}

/// Connection registry stored as a JSON array of
/// `{"communicator": ..., "connectionId": ...}` objects.
///
/// The file is read on every lookup so connections that come and go while
/// the process runs are seen.
pub struct FileLookup {
    path: PathBuf,
}

impl FileLookup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TargetLookup for FileLookup {
    fn name(&self) -> &str {
        "file"
    }

    async fn lookup(&self, policy: &ResolutionPolicy) -> Result<Vec<TargetRecord>, LookupError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            LookupError::Transient(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let records: Vec<TargetRecord> = serde_json::from_str(&content).map_err(|e| {
            LookupError::Malformed(format!("{}: {e}", self.path.display()))
        })?;

        Ok(match policy {
            ResolutionPolicy::SingleTarget { key } => records
                .into_iter()
                .filter(|r| r.communicator.as_deref() == Some(key.as_str()))
                .collect(),
            ResolutionPolicy::Broadcast => records,
        })
    }
}
