//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use memcore::bringup::steps::{
    ALLOCATOR, DISPATCHER, HASH_MAINTAINER, HASH_TABLE, OOM_HANDLER, SLAB_MAINTAINER, STATISTICS,
    WORKERS,
};
use memcore::bringup::{BringupContext, Collaborators, Subsystem, SubsystemError};
use memcore::lifecycle::activator::{WorkerJob, WorkerSpawner};
use parking_lot::Mutex;

/// A lifecycle call observed on a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Init(&'static str),
    Exit(&'static str),
}

pub type Journal = Arc<Mutex<Vec<Event>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Collaborator that records its calls and fails on demand.
pub struct Recording {
    name: &'static str,
    journal: Journal,
    /// Number of upcoming `init` calls that fail.
    failures_left: AtomicUsize,
    needs_settings: bool,
    /// Sleep taken by the first `init` only.
    first_delay: Mutex<Option<Duration>>,
}

impl Recording {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            failures_left: AtomicUsize::new(0),
            needs_settings: false,
            first_delay: Mutex::new(None),
        }
    }

    pub fn failing(self, times: usize) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        self
    }

    /// Make the first `init` block the worker for `delay`.
    pub fn slow_first(self, delay: Duration) -> Self {
        *self.first_delay.lock() = Some(delay);
        self
    }

    pub fn needs_settings(mut self) -> Self {
        self.needs_settings = true;
        self
    }
}

impl Subsystem for Recording {
    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&self, ctx: &mut BringupContext) -> Result<(), SubsystemError> {
        self.journal.lock().push(Event::Init(self.name));
        let delay = self.first_delay.lock().take();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        if self.needs_settings {
            ctx.settings()?;
        }
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(SubsystemError::Code(-12));
        }
        Ok(())
    }

    fn exit(&self) {
        self.journal.lock().push(Event::Exit(self.name));
    }
}

/// Collaborator names in bring-up order.
pub const COLLABORATORS: [&str; 8] = [
    STATISTICS,
    ALLOCATOR,
    HASH_TABLE,
    WORKERS,
    SLAB_MAINTAINER,
    HASH_MAINTAINER,
    DISPATCHER,
    OOM_HANDLER,
];

/// Recording collaborators; `fail_on` fails its first `failures` inits.
pub fn collaborators(journal: &Journal, fail_on: Option<&'static str>, failures: usize) -> Collaborators {
    slow_collaborators(journal, fail_on, failures, None)
}

/// Like [`collaborators`], with `slow` naming a collaborator whose first
/// init takes the given time.
pub fn slow_collaborators(
    journal: &Journal,
    fail_on: Option<&'static str>,
    failures: usize,
    slow: Option<(&'static str, Duration)>,
) -> Collaborators {
    let make = |name: &'static str| -> Arc<dyn Subsystem> {
        let step = Recording::new(name, journal);
        let step = if name == ALLOCATOR || name == HASH_TABLE {
            step.needs_settings()
        } else {
            step
        };
        let step = match slow {
            Some((slow_name, delay)) if slow_name == name => step.slow_first(delay),
            _ => step,
        };
        if fail_on == Some(name) {
            Arc::new(step.failing(failures))
        } else {
            Arc::new(step)
        }
    };

    Collaborators {
        statistics: make(STATISTICS),
        allocator: make(ALLOCATOR),
        hash_table: make(HASH_TABLE),
        workers: make(WORKERS),
        slab_maintainer: make(SLAB_MAINTAINER),
        hash_maintainer: make(HASH_MAINTAINER),
        dispatcher: make(DISPATCHER),
        oom_handler: make(OOM_HANDLER),
    }
}

/// Spawner that can never start a worker.
pub struct FailingSpawner;

impl WorkerSpawner for FailingSpawner {
    fn spawn(&self, _name: &str, _job: WorkerJob) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::WouldBlock, "thread limit reached"))
    }
}

pub fn inits(journal: &Journal) -> Vec<&'static str> {
    journal
        .lock()
        .iter()
        .filter_map(|e| match e {
            Event::Init(name) => Some(*name),
            Event::Exit(_) => None,
        })
        .collect()
}

pub fn exits(journal: &Journal) -> Vec<&'static str> {
    journal
        .lock()
        .iter()
        .filter_map(|e| match e {
            Event::Exit(name) => Some(*name),
            Event::Init(_) => None,
        })
        .collect()
}
