use crate::decoder::decode_chunk;
use crate::fetcher::CursorFetcher;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use voxrelay_core::{AudioUnit, CancelToken, ChunkEncoding, RawChunk, StreamError, StreamPosition};

/// What the bridge pushes to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Audio(AudioUnit),
    /// Terminal. Sent at most once, never together with `Complete`.
    Error(StreamError),
    /// Terminal. The source reported end of stream and every fetched chunk was emitted.
    Complete,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub encoding: ChunkEncoding,
    /// Upper bound on the fetch-size hint.
    pub max_batch_size: usize,
    /// Wait after an empty batch before polling the source again.
    pub idle_poll: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            encoding: ChunkEncoding::default(),
            max_batch_size: 100,
            idle_poll: Duration::from_millis(1000),
        }
    }
}

// ── Shared ─────────────────────────────────────────────────────

/// State touched by both the caller and the worker.
struct Shared {
    demand: AtomicU64,
    terminated: AtomicBool,
    running: AtomicBool,
    wake: Notify,
    cancel: CancelToken,
    parent: Option<CancelToken>,
    events: mpsc::UnboundedSender<BridgeEvent>,
    /// Held across every check-then-send on `events` and across `cancel`, so
    /// no audio unit is sent after the terminal event or a returned `cancel`.
    send_lock: Mutex<()>,
}

impl Shared {
    fn add_demand(&self, n: u64) {
        let _ = self
            .demand
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| {
                Some(d.saturating_add(n))
            });
    }

    /// Take one unit of demand. Returns `false` if none is outstanding.
    fn consume_one(&self) -> bool {
        self.demand
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| d.checked_sub(1))
            .is_ok()
    }

    fn outstanding(&self) -> u64 {
        self.demand.load(Ordering::Acquire)
    }

    fn is_stopped(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
            || self.cancel.is_cancelled()
            || self.parent.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Resolves when either the bridge or its parent token is cancelled.
    async fn cancelled(&self) {
        match &self.parent {
            Some(parent) => tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = parent.cancelled() => {}
            },
            None => self.cancel.cancelled().await,
        }
    }

    fn lock_sends(&self) -> MutexGuard<'_, ()> {
        self.send_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver the terminal signal exactly once and stop the worker.
    fn terminate(&self, event: BridgeEvent) {
        {
            let _sends = self.lock_sends();
            if !self.terminated.swap(true, Ordering::AcqRel) {
                let _ = self.events.send(event);
            }
        }
        self.wake.notify_one();
    }

    /// Send one audio unit unless the bridge has stopped. Returns whether it was sent.
    fn send_audio(&self, unit: AudioUnit) -> bool {
        let _sends = self.lock_sends();
        if self.is_stopped() {
            return false;
        }
        if self.events.send(BridgeEvent::Audio(unit)).is_err() {
            tracing::debug!("bridge consumer dropped, stopping");
            self.terminated.store(true, Ordering::Release);
            return false;
        }
        true
    }
}

// ── DemandBridge ───────────────────────────────────────────────

enum WorkerSlot {
    Idle(Worker),
    Spawned(JoinHandle<()>),
    Finished,
}

/// Demand-driven relay from a [`CursorFetcher`] to a push consumer.
///
/// The consumer declares capacity with [`request_more`](Self::request_more);
/// a single background task fetches, decodes and emits at most that many
/// [`AudioUnit`]s, one [`BridgeEvent::Audio`] per unit. The worker is spawned
/// on the first valid request, so `request_more` must be called from within
/// a Tokio runtime.
pub struct DemandBridge {
    shared: Arc<Shared>,
    worker: Mutex<WorkerSlot>,
    event_rx: Option<mpsc::UnboundedReceiver<BridgeEvent>>,
}

impl DemandBridge {
    pub fn new(
        fetcher: Arc<dyn CursorFetcher>,
        start: StreamPosition,
        config: BridgeConfig,
    ) -> Self {
        Self::build(fetcher, start, config, None)
    }

    /// Build a bridge that also stops when `parent` fires. Cancelling or
    /// dropping the bridge does not cancel `parent`.
    pub fn with_cancel(
        fetcher: Arc<dyn CursorFetcher>,
        start: StreamPosition,
        config: BridgeConfig,
        parent: CancelToken,
    ) -> Self {
        Self::build(fetcher, start, config, Some(parent))
    }

    fn build(
        fetcher: Arc<dyn CursorFetcher>,
        start: StreamPosition,
        config: BridgeConfig,
        parent: Option<CancelToken>,
    ) -> Self {
        let (events, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            demand: AtomicU64::new(0),
            terminated: AtomicBool::new(false),
            running: AtomicBool::new(false),
            wake: Notify::new(),
            cancel: CancelToken::new(),
            parent,
            events,
            send_lock: Mutex::new(()),
        });
        let worker = Worker {
            shared: Arc::clone(&shared),
            fetcher,
            config,
            position: start,
            buffered: VecDeque::new(),
            end_of_stream: false,
        };
        Self {
            shared,
            worker: Mutex::new(WorkerSlot::Idle(worker)),
            event_rx: Some(event_rx),
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<BridgeEvent>> {
        self.event_rx.take()
    }

    /// Ask for `n` more audio units.
    ///
    /// Non-positive `n` fails with [`StreamError::InvalidDemand`], leaves the
    /// demand counter untouched and terminates the bridge. Requests made after
    /// the bridge has terminated or been cancelled are ignored.
    pub fn request_more(&self, n: i64) -> Result<(), StreamError> {
        if n <= 0 {
            let err = StreamError::InvalidDemand(n);
            tracing::warn!(demand = n, "rejected non-positive demand");
            self.shared.terminate(BridgeEvent::Error(err.clone()));
            return Err(err);
        }
        if self.shared.is_stopped() {
            tracing::trace!(demand = n, "bridge stopped, ignoring demand");
            return Ok(());
        }

        self.shared.add_demand(n as u64);
        self.ensure_worker();
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Stop fetching and emitting. Safe to call any number of times.
    pub fn cancel(&self) {
        {
            let _sends = self.shared.lock_sends();
            self.shared.cancel.cancel();
        }
        self.shared.wake.notify_one();
    }

    /// Cancel and wait for the worker task to exit.
    pub async fn shutdown(&self) {
        self.cancel();
        let slot = {
            let mut guard = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, WorkerSlot::Finished)
        };
        if let WorkerSlot::Spawned(handle) = slot {
            let _ = handle.await;
        }
    }

    /// Units requested but not yet emitted.
    pub fn outstanding(&self) -> u64 {
        self.shared.outstanding()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn ensure_worker(&self) {
        let mut guard = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*guard, WorkerSlot::Idle(_)) {
            return;
        }
        if let WorkerSlot::Idle(worker) = std::mem::replace(&mut *guard, WorkerSlot::Finished) {
            self.shared.running.store(true, Ordering::Release);
            *guard = WorkerSlot::Spawned(tokio::spawn(worker.run()));
        }
    }
}

impl Drop for DemandBridge {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ── Worker ─────────────────────────────────────────────────────

/// Owns the stream position; all fetch, decode and emit steps run here in order.
struct Worker {
    shared: Arc<Shared>,
    fetcher: Arc<dyn CursorFetcher>,
    config: BridgeConfig,
    position: StreamPosition,
    buffered: VecDeque<RawChunk>,
    end_of_stream: bool,
}

impl Worker {
    async fn run(mut self) {
        tracing::debug!(
            source = self.fetcher.name(),
            position = %self.position,
            "bridge worker started"
        );

        loop {
            if self.shared.is_stopped() {
                break;
            }

            if self.end_of_stream && self.buffered.is_empty() {
                tracing::debug!("end of stream reached");
                self.shared.terminate(BridgeEvent::Complete);
                break;
            }

            if self.shared.outstanding() == 0 {
                tokio::select! {
                    _ = self.shared.wake.notified() => {}
                    _ = self.shared.cancelled() => {}
                }
                continue;
            }

            if let Some(chunk) = self.buffered.pop_front() {
                if let Err(e) = self.emit(chunk) {
                    tracing::error!("bridge decode error: {e}");
                    self.shared.terminate(BridgeEvent::Error(e));
                    break;
                }
                continue;
            }

            if let Err(e) = self.fetch_next().await {
                tracing::error!(position = %self.position, "bridge fetch error: {e}");
                self.shared.terminate(BridgeEvent::Error(e));
                break;
            }
        }

        self.shared.running.store(false, Ordering::Release);
        tracing::debug!(position = %self.position, "bridge worker stopped");
    }

    fn emit(&mut self, chunk: RawChunk) -> Result<(), StreamError> {
        let unit = decode_chunk(chunk, self.config.encoding)?;
        if self.shared.send_audio(unit) {
            self.shared.consume_one();
        }
        Ok(())
    }

    async fn fetch_next(&mut self) -> Result<(), StreamError> {
        let outstanding = usize::try_from(self.shared.outstanding()).unwrap_or(usize::MAX);
        let limit = outstanding.clamp(1, self.config.max_batch_size.max(1));

        let batch = tokio::select! {
            biased;
            _ = self.shared.cancelled() => return Ok(()),
            result = self.fetcher.fetch(&self.position, limit) => result?,
        };

        tracing::debug!(
            chunks = batch.chunks.len(),
            limit,
            position = %self.position,
            "fetched batch"
        );

        let empty = batch.chunks.is_empty();
        self.buffered.extend(batch.chunks);
        match batch.next_position {
            Some(next) => self.position = next,
            None => self.end_of_stream = true,
        }

        if empty && !self.end_of_stream {
            tokio::select! {
                _ = tokio::time::sleep(self.config.idle_poll) => {}
                _ = self.shared.cancelled() => {}
            }
        }
        Ok(())
    }
}
