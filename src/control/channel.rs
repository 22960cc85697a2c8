//! Core side of the control plane.
//!
//! # Responsibilities
//! - Own the registered start handler
//! - Deliver inbound messages to the handler without blocking
//! - Send bring-up reports back to the peer
//! - Release the transport on unload
//!
//! # Design Decisions
//! - Delivery loads the handler lock-free; the handler must only hand off work
//! - Reports use an unbounded channel so reporting never blocks the worker
//! - After release nothing is delivered and reports are dropped

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::control::message::{ControlMessage, ControlReport};
use crate::control::peer::ControlPeer;

/// Callback run in the delivery context. Must not block.
pub type StartHandler = Box<dyn Fn(ControlMessage) + Send + Sync>;

/// Errors raised by the control plane.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control channel has been released")]
    Released,

    #[error("a start handler is already registered")]
    HandlerBusy,

    #[error("no bring-up report within {0:?}")]
    Timeout(Duration),

    #[error("control channel closed")]
    Closed,
}

/// The transport between the cache core and its controlling peer.
pub struct ControlChannel {
    handler: ArcSwapOption<StartHandler>,
    registration: Mutex<()>,
    reports: Mutex<Option<mpsc::UnboundedSender<ControlReport>>>,
    released: AtomicBool,
    delivery: Mutex<Option<JoinHandle<()>>>,
}

impl ControlChannel {
    /// Open the transport and start the delivery task.
    ///
    /// Must be called from within a tokio runtime. `timeout` bounds how long
    /// the returned peer waits for a report.
    pub fn open(timeout: Duration) -> (Arc<Self>, ControlPeer) {
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<ControlMessage>();
        let (report_tx, report_rx) = mpsc::unbounded_channel();

        let channel = Arc::new(Self {
            handler: ArcSwapOption::empty(),
            registration: Mutex::new(()),
            reports: Mutex::new(Some(report_tx)),
            released: AtomicBool::new(false),
            delivery: Mutex::new(None),
        });

        let weak = Arc::downgrade(&channel);
        let delivery = tokio::spawn(async move {
            while let Some(message) = inbound_rx.recv().await {
                let Some(channel) = weak.upgrade() else { break };
                if channel.is_released() {
                    break;
                }
                channel.deliver(message);
            }
            tracing::debug!("Control delivery task exiting");
        });
        *channel.delivery.lock() = Some(delivery);

        tracing::info!(timeout_secs = timeout.as_secs(), "Control channel opened");
        (channel, ControlPeer::new(inbound_tx, report_rx, timeout))
    }

    /// Install the start handler.
    pub fn register(&self, handler: StartHandler) -> Result<(), ControlError> {
        let _guard = self.registration.lock();
        if self.is_released() {
            return Err(ControlError::Released);
        }
        if self.handler.load().is_some() {
            return Err(ControlError::HandlerBusy);
        }
        self.handler.store(Some(Arc::new(handler)));
        tracing::debug!("Start handler registered");
        Ok(())
    }

    /// Remove the start handler. Returns whether one was installed.
    pub fn unregister(&self) -> bool {
        let _guard = self.registration.lock();
        let removed = self.handler.swap(None).is_some();
        if removed {
            tracing::info!("Start handler unregistered");
        }
        removed
    }

    pub fn is_registered(&self) -> bool {
        self.handler.load().is_some()
    }

    /// Hand a message to the registered handler. Returns whether it was accepted.
    pub fn deliver(&self, message: ControlMessage) -> bool {
        if self.is_released() {
            return false;
        }
        match self.handler.load_full() {
            Some(handler) => {
                let handler: &StartHandler = &handler;
                handler(message);
                true
            }
            None => {
                tracing::warn!(?message, "No handler registered, dropping control message");
                false
            }
        }
    }

    /// Send a bring-up outcome to the peer.
    ///
    /// `starts_seen` is the number of Starts the outcome answers.
    pub fn report(&self, succeeded: bool, starts_seen: u64) {
        let reports = self.reports.lock();
        match reports.as_ref() {
            Some(tx) => {
                let report = ControlReport {
                    succeeded,
                    starts_seen,
                };
                if tx.send(report).is_err() {
                    tracing::warn!(succeeded, "Control peer gone, report dropped");
                }
            }
            None => tracing::debug!(succeeded, "Control channel released, report dropped"),
        }
    }

    /// Tear down the transport. Safe to call repeatedly.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.handler.store(None);
        self.reports.lock().take();
        if let Some(delivery) = self.delivery.lock().take() {
            delivery.abort();
        }
        tracing::info!("Control channel released");
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}
