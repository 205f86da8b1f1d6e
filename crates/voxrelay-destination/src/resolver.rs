use crate::lookup::TargetLookup;
use std::sync::Arc;
use std::time::Duration;
use voxrelay_core::{
    CancelToken, DeliveryTarget, LookupError, ResolutionPolicy, ResolveError, TargetRecord,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt number `attempt` (1-based): doubles each time.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Finds the live delivery targets for an utterance, retrying lookups that
/// may clear up with exponential backoff.
pub struct ConnectionResolver {
    lookup: Arc<dyn TargetLookup>,
    policy: ResolutionPolicy,
    retry: RetryPolicy,
    cancel: Option<CancelToken>,
}

impl ConnectionResolver {
    pub fn new(lookup: Arc<dyn TargetLookup>, policy: ResolutionPolicy, retry: RetryPolicy) -> Self {
        Self {
            lookup,
            policy,
            retry,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    pub async fn resolve(&self) -> Result<Vec<DeliveryTarget>, ResolveError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if self.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
            attempt += 1;

            let err = match self.attempt().await {
                Ok(targets) => {
                    tracing::debug!(
                        attempt,
                        targets = targets.len(),
                        lookup = self.lookup.name(),
                        "resolved delivery targets"
                    );
                    return Ok(targets);
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                tracing::error!(attempt, "target lookup rejected: {err}");
                return Err(ResolveError::Rejected(err));
            }
            if attempt >= max_attempts {
                tracing::error!(attempts = attempt, "target lookup failed, giving up: {err}");
                return Err(ResolveError::ResolutionExhausted {
                    attempts: attempt,
                    last_error: err,
                });
            }

            let delay = self.retry.delay_after(attempt);
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "target lookup failed, retrying: {err}"
            );
            self.backoff(delay).await?;
        }
    }

    async fn attempt(&self) -> Result<Vec<DeliveryTarget>, LookupError> {
        let records = self.lookup.lookup(&self.policy).await?;
        match &self.policy {
            ResolutionPolicy::SingleTarget { key } => {
                let record = records
                    .first()
                    .ok_or_else(|| LookupError::NotFound(key.clone()))?;
                Ok(vec![to_target(record)?])
            }
            ResolutionPolicy::Broadcast => records.iter().map(to_target).collect(),
        }
    }

    async fn backoff(&self, delay: Duration) -> Result<(), ResolveError> {
        match &self.cancel {
            Some(token) => tokio::select! {
                _ = tokio::time::sleep(delay) => Ok(()),
                _ = token.cancelled() => Err(ResolveError::Cancelled),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

fn to_target(record: &TargetRecord) -> Result<DeliveryTarget, LookupError> {
    match record.connection_id.as_deref() {
        Some(id) if !id.is_empty() => Ok(DeliveryTarget::new(id)),
        _ => Err(LookupError::Malformed(format!(
            "record for {} has no connectionId",
            record.communicator.as_deref().unwrap_or("<unknown>")
        ))),
    }
}
