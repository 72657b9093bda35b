// src/feed/pipeline.rs
//! Build -> fetch -> decode, with one in-flight fetch per pipeline.
//!
//! Policy: latest request wins. Submitting a fetch while another is running
//! cancels the older one; its connection is dropped and its completion callback
//! is never invoked. Each fetch carries a delivery gate: `cancel()` either
//! stops the callback before it starts or waits for a running one to return, so
//! once `cancel()` returns no callback is running or can start. A callback that
//! cancels its own pipeline does not wait on itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use metrics::{counter, gauge, histogram};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::feed::decoder::{self, DecodeError};
use crate::feed::fetcher::{FetchError, HttpFetcher};
use crate::feed::request::{self, RequestError};
use crate::feed::types::{FetchRequestOptions, SeismicEvent};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidEndpoint(#[from] RequestError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidEndpoint(_) => "invalid_endpoint",
            PipelineError::Fetch(e) => e.kind(),
            PipelineError::Decode(_) => "malformed_feed",
        }
    }

    pub fn is_malformed_feed(&self) -> bool {
        matches!(self, PipelineError::Decode(DecodeError::MalformedFeed(_)))
    }
}

pub type FetchOutcome = Result<Vec<SeismicEvent>, PipelineError>;

/// One complete fetch, awaited in place. No single-flight bookkeeping.
pub async fn fetch_records(
    fetcher: &HttpFetcher,
    base_endpoint: &str,
    options: &FetchRequestOptions,
) -> FetchOutcome {
    let t0 = std::time::Instant::now();
    counter!("feed_fetch_total").increment(1);

    let outcome = run_stages(fetcher, base_endpoint, options).await;

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_fetch_ms").record(ms);
    gauge!("feed_last_fetch_ts").set(chrono::Utc::now().timestamp() as f64);

    match &outcome {
        Ok(events) => {
            tracing::info!(target: "feed", events = events.len(), elapsed_ms = ms as u64, "fetch done");
        }
        Err(e) => {
            tracing::warn!(target: "feed", kind = e.kind(), error = %e, "fetch failed");
            counter!("feed_fetch_errors_total", "kind" => e.kind()).increment(1);
        }
    }
    outcome
}

async fn run_stages(
    fetcher: &HttpFetcher,
    base_endpoint: &str,
    options: &FetchRequestOptions,
) -> FetchOutcome {
    let url = request::build(base_endpoint, options)?;
    let body = fetcher.fetch(&url).await?;
    Ok(decoder::decode(&body)?)
}

struct InFlight {
    id: u64,
    token: CancellationToken,
    gate: Arc<Gate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Pending,
    Running(ThreadId),
    Finished,
    Cancelled,
}

/// Decides, once, whether a fetch's callback runs.
struct Gate {
    state: Mutex<Delivery>,
    done: Condvar,
}

impl Gate {
    fn new() -> Self {
        Self {
            state: Mutex::new(Delivery::Pending),
            done: Condvar::new(),
        }
    }

    fn begin(&self) -> Option<Delivering<'_>> {
        let mut state = lock(&self.state);
        if *state != Delivery::Pending {
            return None;
        }
        *state = Delivery::Running(thread::current().id());
        Some(Delivering(self))
    }

    /// `true` if the callback will never run. Blocks while it is running on
    /// another thread.
    fn cancel(&self) -> bool {
        let mut state = lock(&self.state);
        loop {
            match *state {
                Delivery::Pending => {
                    *state = Delivery::Cancelled;
                    return true;
                }
                Delivery::Running(t) if t != thread::current().id() => {
                    state = self.done.wait(state).unwrap_or_else(PoisonError::into_inner);
                }
                _ => return false,
            }
        }
    }

    fn is_pending(&self) -> bool {
        *lock(&self.state) == Delivery::Pending
    }
}

// Marks the delivery finished on drop, including when the callback panics.
struct Delivering<'a>(&'a Gate);

impl Drop for Delivering<'_> {
    fn drop(&mut self) {
        *lock(&self.0.state) = Delivery::Finished;
        self.0.done.notify_all();
    }
}

/// Resolves when the spawned fetch task ends.
#[derive(Debug)]
pub struct FetchHandle {
    id: u64,
    join: JoinHandle<bool>,
}

impl FetchHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the task to end. `true` if the completion callback ran.
    pub async fn finished(self) -> bool {
        self.join.await.unwrap_or(false)
    }
}

/// Owned by whichever session or request context issues fetches.
pub struct FetchPipeline {
    fetcher: HttpFetcher,
    base_endpoint: String,
    slot: Arc<Mutex<Option<InFlight>>>,
    next_id: AtomicU64,
}

impl FetchPipeline {
    pub fn new(fetcher: HttpFetcher, base_endpoint: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_endpoint: base_endpoint.into(),
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn base_endpoint(&self) -> &str {
        &self.base_endpoint
    }

    /// Start a fetch on the Tokio runtime and return immediately.
    ///
    /// `on_complete` runs on the worker task, exactly once, unless the fetch is
    /// cancelled or replaced first, in which case it is dropped uncalled. A
    /// replaced callback that is already running elsewhere is waited for.
    /// Must be called from within a Tokio runtime.
    pub fn fetch_all<F>(&self, options: FetchRequestOptions, on_complete: F) -> FetchHandle
    where
        F: FnOnce(FetchOutcome) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        let gate = Arc::new(Gate::new());

        let prev = lock(&self.slot).replace(InFlight {
            id,
            token: token.clone(),
            gate: Arc::clone(&gate),
        });
        if let Some(prev) = prev {
            prev.token.cancel();
            if prev.gate.cancel() {
                counter!("feed_fetch_cancelled_total").increment(1);
                tracing::debug!(target: "feed", replaced = prev.id, by = id, "fetch replaced");
            }
        }

        let fetcher = self.fetcher.clone();
        let endpoint = self.base_endpoint.clone();
        let slot = Arc::clone(&self.slot);

        let join = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return false,
                out = fetch_records(&fetcher, &endpoint, &options) => out,
            };

            // Decided under the slot lock: a cancel or replacement that got there first wins.
            let delivering = {
                let guard = lock(&slot);
                if !guard.as_ref().is_some_and(|current| current.id == id) {
                    return false;
                }
                gate.begin()
            };
            let Some(delivering) = delivering else {
                return false;
            };
            on_complete(outcome);
            drop(delivering);

            let mut guard = lock(&slot);
            if guard.as_ref().is_some_and(|current| current.id == id) {
                guard.take();
            }
            true
        });

        FetchHandle { id, join }
    }

    /// Submit and await the outcome. `None` when the fetch was cancelled or replaced.
    pub async fn fetch_latest(&self, options: FetchRequestOptions) -> Option<FetchOutcome> {
        let (tx, rx) = oneshot::channel();
        let _handle = self.fetch_all(options, move |outcome| {
            let _ = tx.send(outcome);
        });
        rx.await.ok()
    }

    /// Cancel the in-flight fetch, if any. Returns whether its callback was
    /// stopped; a callback already running is waited for and yields `false`.
    pub fn cancel(&self) -> bool {
        let Some(inflight) = lock(&self.slot).take() else {
            return false;
        };
        inflight.token.cancel();
        let stopped = inflight.gate.cancel();
        if stopped {
            counter!("feed_fetch_cancelled_total").increment(1);
            tracing::debug!(target: "feed", id = inflight.id, "fetch cancelled");
        }
        stopped
    }

    /// A fetch is submitted and its callback has not started yet.
    pub fn is_in_flight(&self) -> bool {
        lock(&self.slot).as_ref().is_some_and(|inflight| inflight.gate.is_pending())
    }
}

impl Drop for FetchPipeline {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poison) => poison.into_inner(),
    }
}
