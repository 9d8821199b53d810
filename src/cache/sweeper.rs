//! Periodic expiry for the record stores.
//!
//! Reads never return expired data, so sweeping only reclaims memory. Each
//! store gets its own sweeper; the sweeper lives exactly as long as the cache
//! that owns it and stops when signalled or dropped.
//!
//! By default a sweeper runs on its own thread, so it does not depend on
//! whichever Tokio runtime happened to be current when the cache was built.
//! Callers whose runtime outlives the cache can opt into a runtime task
//! instead (`CacheConfig::runtime_sweepers`).

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::CacheStats;
use super::clock::Clock;
use super::cname::CnameCache;
use super::data::DataCache;

/// Shortest period a sweeper will run at.
pub const MIN_EVICTION_INTERVAL: Duration = Duration::from_secs(1);

/// A store that can drop its expired entries in one pass.
pub trait Sweep: Send + Sync + 'static {
    /// Remove everything expired at `now` (unix seconds); return the count.
    fn sweep(&self, now: u64) -> usize;
}

impl Sweep for CnameCache {
    fn sweep(&self, now: u64) -> usize {
        CnameCache::sweep(self, now)
    }
}

impl Sweep for DataCache {
    fn sweep(&self, now: u64) -> usize {
        DataCache::sweep(self, now)
    }
}

/// Clamp an eviction interval to [`MIN_EVICTION_INTERVAL`].
pub fn effective_interval(requested: Duration) -> Duration {
    requested.max(MIN_EVICTION_INTERVAL)
}

enum Driver {
    Task {
        shutdown_tx: broadcast::Sender<()>,
        handle: tokio::task::JoinHandle<()>,
    },
    Thread {
        // Dropping the sender wakes the thread.
        shutdown_tx: Option<channel::Sender<()>>,
        handle: Option<thread::JoinHandle<()>>,
    },
}

pub struct Sweeper {
    store: &'static str,
    period: Duration,
    driver: Mutex<Driver>,
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("store", &self.store)
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Sweeper {
    /// Start sweeping `target` every `period` (clamped to at least one
    /// second) on a dedicated thread.
    pub fn spawn<S: Sweep>(
        store: &'static str,
        target: Arc<S>,
        clock: Arc<dyn Clock>,
        stats: Arc<CacheStats>,
        period: Duration,
    ) -> Self {
        Self::spawn_with(store, target, clock, stats, period, false)
    }

    /// Like [`Sweeper::spawn`], but with `on_runtime` set and a Tokio runtime
    /// current, the sweeper becomes a task on that runtime. Such a sweeper
    /// ends when the runtime shuts down, so the runtime must outlive the
    /// cache. Without a current runtime it falls back to a thread.
    pub fn spawn_with<S: Sweep>(
        store: &'static str,
        target: Arc<S>,
        clock: Arc<dyn Clock>,
        stats: Arc<CacheStats>,
        period: Duration,
        on_runtime: bool,
    ) -> Self {
        let period = effective_interval(period);
        let runtime = if on_runtime {
            Handle::try_current().ok()
        } else {
            None
        };
        let driver = match runtime {
            Some(runtime) => spawn_task(&runtime, store, target, clock, stats, period),
            None => spawn_thread(store, target, clock, stats, period),
        };
        info!("Started {} sweeper (interval: {:?})", store, period);

        Self {
            store,
            period,
            driver: Mutex::new(driver),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        match &*self.driver.lock() {
            Driver::Task { handle, .. } => !handle.is_finished(),
            Driver::Thread { handle, .. } => handle.as_ref().is_some_and(|h| !h.is_finished()),
        }
    }

    /// Signal the sweeper to stop. A thread-driven sweeper is joined before
    /// this returns; a task-driven one exits at its next poll.
    pub fn stop(&self) {
        let mut driver = self.driver.lock();
        match &mut *driver {
            Driver::Task { shutdown_tx, .. } => {
                // No receiver means the task already finished.
                let _ = shutdown_tx.send(());
            }
            Driver::Thread {
                shutdown_tx,
                handle,
            } => {
                drop(shutdown_tx.take());
                if let Some(handle) = handle.take() {
                    if handle.join().is_err() {
                        warn!("{} sweeper thread panicked", self.store);
                    }
                }
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sweep_once<S: Sweep>(store: &str, target: &S, clock: &dyn Clock, stats: &CacheStats) {
    let removed = target.sweep(clock.now_secs());
    if removed > 0 {
        stats.record_expired_evictions(removed as u64);
        debug!("{} sweeper removed {} expired entries", store, removed);
    }
}

fn spawn_task<S: Sweep>(
    runtime: &Handle,
    store: &'static str,
    target: Arc<S>,
    clock: Arc<dyn Clock>,
    stats: Arc<CacheStats>,
    period: Duration,
) -> Driver {
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

    let handle = runtime.spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; there is nothing to expire yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("{} sweeper received shutdown signal", store);
                    break;
                }
                _ = ticker.tick() => {
                    sweep_once(store, target.as_ref(), clock.as_ref(), &stats);
                }
            }
        }
    });

    Driver::Task {
        shutdown_tx,
        handle,
    }
}

fn spawn_thread<S: Sweep>(
    store: &'static str,
    target: Arc<S>,
    clock: Arc<dyn Clock>,
    stats: Arc<CacheStats>,
    period: Duration,
) -> Driver {
    let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);

    let spawned = thread::Builder::new()
        .name(format!("rrcache-{store}-sweeper"))
        .spawn(move || {
            let ticker = channel::tick(period);
            loop {
                crossbeam::select! {
                    recv(shutdown_rx) -> _ => {
                        info!("{} sweeper received shutdown signal", store);
                        break;
                    }
                    recv(ticker) -> _ => {
                        sweep_once(store, target.as_ref(), clock.as_ref(), &stats);
                    }
                }
            }
        });

    match spawned {
        Ok(handle) => Driver::Thread {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        },
        Err(e) => {
            // Reads stay correct without a sweeper; memory is reclaimed lazily.
            warn!("Failed to start {} sweeper thread: {}", store, e);
            Driver::Thread {
                shutdown_tx: None,
                handle: None,
            }
        }
    }
}
