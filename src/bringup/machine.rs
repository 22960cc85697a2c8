//! Bring-up state machine.
//!
//! # States
//! - Idle: nothing started
//! - Running(i): step i is being initialized
//! - Succeeded: every step initialized
//! - Failed(i): step i failed, steps before it were rolled back
//!
//! # State Transitions
//! ```text
//! Idle → Running(0)
//! Running(i) → Running(i+1)   init ok, more steps
//! Running(i) → Succeeded      init ok, last step
//! Running(i) → Failed(i)      init failed → exit(i-1) … exit(0)
//! ```
//!
//! # Design Decisions
//! - The step list is data; reordering subsystems never touches this code
//! - A failed step cleans up after itself and never gets `exit`
//! - Rollback always visits every earlier step
//! - A panicking `init` fails its step; a panicking `exit` is logged and
//!   rollback carries on

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::bringup::status::ModuleStatus;
use crate::bringup::subsystem::{BringupContext, Subsystem, SubsystemError};
use crate::observability::metrics;

/// A step failed and the attempt was rolled back.
#[derive(Debug, Error)]
#[error("step {index} ({step}) failed: {source}")]
pub struct BringupError {
    pub index: usize,
    pub step: &'static str,
    #[source]
    pub source: SubsystemError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringupState {
    Idle,
    Running(usize),
    Succeeded,
    Failed(usize),
}

impl BringupState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BringupState::Succeeded | BringupState::Failed(_))
    }
}

/// Drives one attempt over an ordered step list.
pub struct BringupMachine<'a> {
    steps: &'a [Arc<dyn Subsystem>],
    state: BringupState,
    error: Option<BringupError>,
}

impl<'a> BringupMachine<'a> {
    pub fn new(steps: &'a [Arc<dyn Subsystem>]) -> Self {
        Self {
            steps,
            state: BringupState::Idle,
            error: None,
        }
    }

    pub fn state(&self) -> BringupState {
        self.state
    }

    /// Perform a single transition and return the new state.
    pub fn advance(&mut self, ctx: &mut BringupContext) -> BringupState {
        self.state = match self.state {
            BringupState::Idle if self.steps.is_empty() => BringupState::Succeeded,
            BringupState::Idle => BringupState::Running(0),
            BringupState::Running(index) => self.init_step(index, ctx),
            terminal => terminal,
        };
        self.state
    }

    /// Advance until a terminal state is reached.
    pub fn run(&mut self, ctx: &mut BringupContext) -> Result<(), BringupError> {
        while !self.state.is_terminal() {
            self.advance(ctx);
        }
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn init_step(&mut self, index: usize, ctx: &mut BringupContext) -> BringupState {
        let steps = self.steps;
        let step = &steps[index];
        let started = Instant::now();
        tracing::debug!(index, step = step.name(), "Initializing subsystem");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| step.init(ctx)))
            .unwrap_or_else(|payload| Err(SubsystemError::Panicked(panic_message(&*payload))));

        match outcome {
            Ok(()) => {
                metrics::record_step(step.name(), started);
                tracing::info!(
                    index,
                    step = step.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Subsystem initialized"
                );
                if index + 1 == self.steps.len() {
                    BringupState::Succeeded
                } else {
                    BringupState::Running(index + 1)
                }
            }
            Err(source) => {
                tracing::error!(index, step = step.name(), error = %source, "Subsystem init failed");
                self.rollback(index);
                self.error = Some(BringupError {
                    index,
                    step: step.name(),
                    source,
                });
                BringupState::Failed(index)
            }
        }
    }

    fn rollback(&self, failed: usize) {
        for (index, step) in self.steps[..failed].iter().enumerate().rev() {
            tracing::info!(index, step = step.name(), "Rolling back subsystem");
            exit_step(index, &**step);
        }
    }
}

/// Run `exit` on one step, containing a panic so the caller can continue.
fn exit_step(index: usize, step: &dyn Subsystem) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| step.exit())) {
        tracing::error!(
            index,
            step = step.name(),
            panic = %panic_message(&*payload),
            "Subsystem exit panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// The ordered subsystem list of the cache core.
///
/// Shared between the activator, which runs it, and the shutdown path, which
/// tears it down.
pub struct BringupSequence {
    steps: Vec<Arc<dyn Subsystem>>,
}

impl BringupSequence {
    pub fn new(steps: Vec<Arc<dyn Subsystem>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run one attempt to a terminal state and publish the module status.
    pub fn run(&self, ctx: &mut BringupContext) -> Result<(), BringupError> {
        let span = tracing::info_span!("bringup", attempt = %ctx.attempt);
        let _enter = span.enter();
        tracing::info!(steps = self.steps.len(), "Bring-up started");

        let result = BringupMachine::new(&self.steps).run(ctx);
        match &result {
            Ok(()) => {
                ctx.status.publish(ModuleStatus::Succeeded);
                tracing::info!("Bring-up succeeded, server started");
            }
            Err(e) => {
                ctx.status.publish(ModuleStatus::Failed);
                tracing::error!(error = %e, "Bring-up failed, progress rolled back");
            }
        }
        metrics::record_attempt(result.is_ok());
        result
    }

    /// Exit every step in reverse bring-up order.
    pub fn teardown(&self) {
        for (index, step) in self.steps.iter().enumerate().rev() {
            tracing::info!(index, step = step.name(), "Stopping subsystem");
            exit_step(index, &**step);
        }
    }
}
