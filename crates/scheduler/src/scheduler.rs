//! The outgoing scheduler (§4.5): one tick loop per `ConfigStore`,
//! pacing per-endpoint dispatch against its configured frequency and
//! the global multiplier, bounded by a shared semaphore, with
//! pause/resume/emergency-stop/stop control.

use crate::interval::request_interval;
use moxapp_client::HttpClient;
use moxapp_config::ConfigStore;
use moxapp_core::{Clock, RequestResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const STOP_GRACE: Duration = Duration::from_secs(30);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);
const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Point-in-time counters exposed alongside the metrics snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerCounters {
    pub scheduled: u64,
    pub in_flight: u64,
    pub skipped: u64,
}

/// Callback invoked exactly once per executed (or skipped-before-send)
/// request, typically wired to `OutgoingCollector::record`.
pub type ResultSink = Arc<dyn Fn(RequestResult) + Send + Sync>;

struct SemaphoreSlot {
    capacity: u32,
    semaphore: Arc<Semaphore>,
}

/// Drives outgoing traffic for every enabled endpoint in a
/// `ConfigStore`, at the rate and concurrency the store's global
/// settings describe.
pub struct OutgoingScheduler {
    store: Arc<ConfigStore>,
    client: Arc<HttpClient>,
    clock: Arc<dyn Clock>,
    sink: ResultSink,

    next_request_at: Mutex<HashMap<String, Instant>>,
    semaphore: Mutex<SemaphoreSlot>,

    scheduled: AtomicU64,
    in_flight: AtomicU64,
    skipped: AtomicU64,

    paused: AtomicBool,
    running: AtomicBool,

    /// Cancels in-flight requests. Rebuilt on `resume` if a prior
    /// `emergency_stop` left it cancelled.
    cancel: Mutex<CancellationToken>,
    /// Terminates the tick loop itself. Only `stop` triggers this.
    loop_cancel: Mutex<CancellationToken>,
    tick_handle: Mutex<Option<JoinHandle<()>>>,
}

impl OutgoingScheduler {
    pub fn new(store: Arc<ConfigStore>, client: Arc<HttpClient>, clock: Arc<dyn Clock>, sink: ResultSink) -> Arc<Self> {
        Arc::new(Self {
            store,
            client,
            clock,
            sink,
            next_request_at: Mutex::new(HashMap::new()),
            semaphore: Mutex::new(SemaphoreSlot { capacity: 1, semaphore: Arc::new(Semaphore::new(1)) }),
            scheduled: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            running: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            loop_cancel: Mutex::new(CancellationToken::new()),
            tick_handle: Mutex::new(None),
        })
    }

    pub fn counters(&self) -> SchedulerCounters {
        SchedulerCounters {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the tick loop. A no-op if already running.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let mut loop_cancel = self.loop_cancel.lock().unwrap_or_else(|e| e.into_inner());
            if loop_cancel.is_cancelled() {
                *loop_cancel = CancellationToken::new();
            }
        }
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run_tick_loop().await });
        *self.tick_handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    async fn run_tick_loop(self: Arc<Self>) {
        let loop_cancel = self.loop_cancel.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                _ = loop_cancel.cancelled() => {
                    debug!("scheduler tick loop stopping");
                    return;
                }
                _ = interval.tick() => {
                    self.on_tick().await;
                }
            }
        }
    }

    async fn on_tick(self: &Arc<Self>) {
        if self.paused.load(Ordering::Relaxed) {
            return;
        }
        let snapshot = self.store.snapshot().await;
        if !snapshot.global.enabled {
            return;
        }

        let now = self.clock.now_monotonic();
        let mut next_request_at = self.next_request_at.lock().unwrap_or_else(|e| e.into_inner());
        let mut due = Vec::new();
        for endpoint in snapshot.outgoing_endpoints.iter().filter(|e| e.enabled) {
            let next = *next_request_at.entry(endpoint.name.clone()).or_insert(now);
            if now >= next {
                let interval = request_interval(endpoint.frequency, snapshot.global.global_multiplier);
                // Advance from the due time, not from `now`, so a burst
                // of delayed ticks doesn't let the rate drift upward.
                next_request_at.insert(endpoint.name.clone(), next + interval);
                due.push(endpoint.clone());
            }
        }
        drop(next_request_at);

        for endpoint in due {
            self.scheduled.fetch_add(1, Ordering::Relaxed);
            let this = Arc::clone(self);
            tokio::spawn(async move { this.dispatch(endpoint).await });
        }
    }

    async fn dispatch(self: Arc<Self>, endpoint: moxapp_config::OutgoingEndpoint) {
        if self.paused.load(Ordering::Relaxed) {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let cancel = self.cancel.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let concurrent_requests = self.store.snapshot().await.global.concurrent_requests;
        let semaphore = self.semaphore_for(concurrent_requests.max(1));

        let permit = tokio::select! {
            _ = cancel.cancelled() => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
            permit = semaphore.acquire_owned() => permit,
        };
        let permit = match permit {
            Ok(p) => p,
            Err(_) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        // Re-check: settings may have changed, or we may have been
        // paused/stopped, while this dispatch waited on the semaphore.
        let snapshot = self.store.snapshot().await;
        let still_enabled = snapshot.global.enabled
            && snapshot.outgoing_endpoints.iter().any(|e| e.name == endpoint.name && e.enabled);
        if self.paused.load(Ordering::Relaxed) || !still_enabled {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            drop(permit);
            return;
        }

        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let timeout = Duration::from_secs(endpoint.timeout);
        let mut result = self.client.execute(&endpoint, timeout, cancel).await;
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        drop(permit);

        // A cancellation observed while we were neither paused nor
        // stopped wasn't a deliberate emergency stop (the caller would
        // have left this dispatch running right up to its own
        // timeout); report it as a timeout instead. Which of the two
        // `tokio::select!` arms inside `HttpClient::execute` actually
        // wins that race is not pinned down by design.
        if result.error_kind == Some(moxapp_core::ErrorKind::Cancelled) {
            let still_running = !self.paused.load(Ordering::Relaxed) && self.store.snapshot().await.global.enabled;
            if still_running {
                result.error_kind = Some(moxapp_core::ErrorKind::Timeout);
                result.error_msg = Some("deadline exceeded".into());
            }
        }

        (self.sink)(result);
    }

    fn semaphore_for(&self, capacity: u32) -> Arc<Semaphore> {
        let mut slot = self.semaphore.lock().unwrap_or_else(|e| e.into_inner());
        if slot.capacity != capacity {
            slot.capacity = capacity;
            slot.semaphore = Arc::new(Semaphore::new(capacity as usize));
        }
        Arc::clone(&slot.semaphore)
    }

    /// Halt scheduling without cancelling in-flight requests.
    pub async fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        self.store.set_enabled(false).await;
    }

    /// Resume scheduling, re-arming the cancellation token if a prior
    /// `emergency_stop` had tripped it.
    pub async fn resume(&self) {
        {
            let mut cancel = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
            if cancel.is_cancelled() {
                *cancel = CancellationToken::new();
            }
        }
        self.paused.store(false, Ordering::SeqCst);
        self.store.set_enabled(true).await;
    }

    /// Halt scheduling and cancel every in-flight request immediately.
    pub async fn emergency_stop(&self) {
        self.paused.store(true, Ordering::SeqCst);
        self.store.set_enabled(false).await;
        self.cancel.lock().unwrap_or_else(|e| e.into_inner()).cancel();
    }

    /// Cooperative shutdown: stop scheduling new work, wait up to 30s
    /// for in-flight requests to finish on their own, then stop the
    /// tick loop. Returns the number of requests still in flight when
    /// the grace period elapsed.
    pub async fn stop(&self) -> u64 {
        self.paused.store(true, Ordering::SeqCst);
        self.store.set_enabled(false).await;

        let deadline = Instant::now() + STOP_GRACE;
        while self.in_flight.load(Ordering::Relaxed) > 0 && Instant::now() < deadline {
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }
        let remaining = self.in_flight.load(Ordering::Relaxed);
        if remaining > 0 {
            warn!(remaining, "stopping scheduler with requests still in flight");
        }

        self.loop_cancel.lock().unwrap_or_else(|e| e.into_inner()).cancel();
        let handle = self.tick_handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.running.store(false, Ordering::SeqCst);
        remaining
    }
}
