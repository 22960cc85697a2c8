//! Moves bring-up off the control delivery path.
//!
//! # Responsibilities
//! - Accept Start from the control channel and return immediately
//! - Spawn a dedicated worker thread that runs the bring-up sequence
//! - Report the outcome back over the control channel
//!
//! # Design Decisions
//! - Worker spawn failure is logged only; no retry, nothing started
//! - At most one attempt runs at a time; a Start arriving meanwhile joins it
//!   and is answered by its report
//! - A start after a successful bring-up re-reports success without rerunning
//! - Every report carries the number of Starts it answers

use std::io;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::bringup::{BringupContext, BringupSequence, CoreServices, ModuleStatus};
use crate::control::{ControlChannel, ControlMessage, StartHandler};

/// Thread name of the bring-up worker.
pub const WORKER_NAME: &str = "memcore-bringup";

/// Unit of work run on the worker.
pub type WorkerJob = Box<dyn FnOnce() + Send + 'static>;

/// Starts an independent execution unit for a job.
pub trait WorkerSpawner: Send + Sync {
    fn spawn(&self, name: &str, job: WorkerJob) -> io::Result<()>;
}

/// Spawns a named, detached OS thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl WorkerSpawner for ThreadSpawner {
    fn spawn(&self, name: &str, job: WorkerJob) -> io::Result<()> {
        thread::Builder::new()
            .name(name.to_string())
            .spawn(job)
            .map(|_| ())
    }
}

/// Start bookkeeping, updated only under the activator's lock.
#[derive(Debug, Default)]
struct Gate {
    starts: u64,
    in_flight: bool,
}

pub struct Activator {
    sequence: Arc<BringupSequence>,
    services: CoreServices,
    channel: Arc<ControlChannel>,
    spawner: Arc<dyn WorkerSpawner>,
    gate: Mutex<Gate>,
}

impl Activator {
    pub fn new(
        sequence: Arc<BringupSequence>,
        services: CoreServices,
        channel: Arc<ControlChannel>,
        spawner: Arc<dyn WorkerSpawner>,
    ) -> Self {
        Self {
            sequence,
            services,
            channel,
            spawner,
            gate: Mutex::new(Gate::default()),
        }
    }

    /// Build the handler to register on the control channel.
    ///
    /// The handler holds the activator weakly so the channel never keeps it
    /// alive.
    pub fn handler(self: &Arc<Self>) -> StartHandler {
        let weak = Arc::downgrade(self);
        Box::new(move |message| {
            if let Some(activator) = weak.upgrade() {
                activator.on_message(message);
            }
        })
    }

    /// Entry point from the delivery context. Never blocks on bring-up work.
    pub fn on_message(self: &Arc<Self>, message: ControlMessage) {
        match message {
            ControlMessage::Start => self.on_start(),
        }
    }

    fn on_start(self: &Arc<Self>) {
        let mut gate = self.gate.lock();
        gate.starts += 1;

        if gate.in_flight {
            tracing::warn!(
                starts = gate.starts,
                "Start received while a bring-up attempt is in flight, joining it"
            );
            return;
        }

        if self.services.status.get() == ModuleStatus::Succeeded {
            tracing::info!("Start received but cache core is already running");
            self.channel.report(true, gate.starts);
            return;
        }

        gate.in_flight = true;
        drop(gate);

        let activator = Arc::clone(self);
        let job: WorkerJob = Box::new(move || {
            activator.run_attempt();
        });

        if let Err(e) = self.spawner.spawn(WORKER_NAME, job) {
            tracing::error!(error = %e, "Failed to spawn bring-up worker");
            self.gate.lock().in_flight = false;
        }
    }

    /// Run one bring-up attempt on the calling thread and report it.
    pub fn run_attempt(&self) -> bool {
        self.services.status.begin_attempt();
        let mut ctx = BringupContext::new(&self.services);
        let succeeded = self.sequence.run(&mut ctx).is_ok();

        let starts_seen = {
            let mut gate = self.gate.lock();
            gate.in_flight = false;
            gate.starts
        };
        self.channel.report(succeeded, starts_seen);
        succeeded
    }

    pub fn is_in_flight(&self) -> bool {
        self.gate.lock().in_flight
    }

    /// Starts accepted from the control channel so far.
    pub fn starts(&self) -> u64 {
        self.gate.lock().starts
    }
}
