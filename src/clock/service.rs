//! Process-relative clock.
//!
//! # Responsibilities
//! - Record the start reference and seed relative time
//! - Refresh relative time once per tick from a recurring task
//! - Convert client expiration values to relative time
//!
//! # Design Decisions
//! - Zero is reserved for "never expires"; the reference is backdated so
//!   real elapsed time never produces it
//! - Readers load an atomic and tolerate one tick of staleness
//! - Relative time saturates at `u32::MAX` instead of wrapping
//! - A wall clock stepping backwards never moves relative time backwards

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::clock::wall::{SystemClock, WallClock};
use crate::observability::metrics;

/// Largest plausible relative expiration delta (30 days). Larger values are
/// absolute Unix timestamps.
pub const HORIZON_SECS: u32 = 60 * 60 * 24 * 30;

/// How far the start reference is backdated.
pub const START_BACKDATE_SECS: u32 = 2;

/// Period of the refresh tick.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Errors raised when starting the clock.
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("clock service is already running")]
    AlreadyRunning,
}

/// Monotonic seconds-elapsed counter shared by every collaborator needing "now".
///
/// Single writer (the tick), many lock-free readers.
pub struct ClockService {
    wall: Arc<dyn WallClock>,
    interval: Duration,
    runtime: Handle,
    start_reference: AtomicU64,
    current: AtomicU32,
    running: AtomicBool,
    /// Held for the whole body of a tick so `stop` can wait one out.
    tick_lock: Mutex<()>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl ClockService {
    /// Create a clock reading `wall` and scheduling ticks on `runtime`.
    pub fn new(wall: Arc<dyn WallClock>, runtime: Handle) -> Self {
        Self {
            wall,
            interval: TICK_INTERVAL,
            runtime,
            start_reference: AtomicU64::new(0),
            current: AtomicU32::new(0),
            running: AtomicBool::new(false),
            tick_lock: Mutex::new(()),
            ticker: Mutex::new(None),
        }
    }

    /// Create a clock backed by the operating system clock.
    pub fn system(runtime: Handle) -> Self {
        Self::new(Arc::new(SystemClock), runtime)
    }

    /// Override the tick period.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Record the start reference, seed relative time and schedule ticks.
    pub fn start(self: &Arc<Self>) -> Result<(), ClockError> {
        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            return Err(ClockError::AlreadyRunning);
        }

        let now = self.wall.now_secs();
        self.start_reference
            .store(now.saturating_sub(START_BACKDATE_SECS as u64), Ordering::Release);
        self.current.store(START_BACKDATE_SECS, Ordering::Release);
        self.running.store(true, Ordering::Release);

        let weak = Arc::downgrade(self);
        let interval = self.interval;
        *ticker = Some(self.runtime.spawn(async move {
            let mut ticks = time::interval_at(Instant::now() + interval, interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let Some(clock) = weak.upgrade() else { break };
                if !clock.is_running() {
                    break;
                }
                clock.tick();
            }
        }));

        tracing::info!(
            start_reference = self.start_reference(),
            interval_ms = interval.as_millis() as u64,
            "Clock service started"
        );
        Ok(())
    }

    /// Recompute relative time from the wall clock.
    pub fn tick(&self) {
        let _guard = self.tick_lock.lock();
        if !self.is_running() {
            return;
        }

        let elapsed = self
            .wall
            .now_secs()
            .saturating_sub(self.start_reference.load(Ordering::Acquire));
        let next = u32::try_from(elapsed).unwrap_or(u32::MAX);
        let prev = self.current.fetch_max(next, Ordering::AcqRel);
        if next < prev {
            tracing::warn!(prev, next, "Wall clock moved backwards, holding relative time");
        }
        metrics::record_clock(next.max(prev));
    }

    /// Cancel further ticks and wait for an in-flight tick to finish.
    ///
    /// Once this returns no tick runs. Stopping a stopped clock is a no-op.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
            tracing::info!(current = self.current(), "Clock service stopped");
        }
        drop(self.tick_lock.lock());
    }

    /// Whether ticks are currently scheduled.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Seconds elapsed since the start reference.
    pub fn current(&self) -> u32 {
        self.current.load(Ordering::Acquire)
    }

    /// Absolute wall time (seconds) that relative time is measured from.
    pub fn start_reference(&self) -> u64 {
        self.start_reference.load(Ordering::Acquire)
    }

    /// Convert a client supplied expiration value to relative time.
    ///
    /// `0` means never expire. Values above [`HORIZON_SECS`] are absolute
    /// timestamps; those at or before the start reference map to `1` so they
    /// expire immediately without colliding with the never-expire sentinel.
    pub fn to_expiry_relative(&self, exptime: u32) -> u32 {
        if exptime == 0 {
            return 0;
        }

        if exptime > HORIZON_SECS {
            let started = self.start_reference();
            let absolute = u64::from(exptime);
            if absolute <= started {
                return 1;
            }
            return u32::try_from(absolute - started).unwrap_or(u32::MAX);
        }

        self.current().saturating_add(exptime)
    }
}

impl Drop for ClockService {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}
