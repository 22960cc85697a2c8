//! Peer side of the control plane: the party that asks for a start.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::control::channel::ControlError;
use crate::control::message::{ControlMessage, ControlReport};

pub struct ControlPeer {
    inbound: mpsc::UnboundedSender<ControlMessage>,
    reports: mpsc::UnboundedReceiver<ControlReport>,
    timeout: Duration,
    starts_sent: u64,
}

impl ControlPeer {
    pub(crate) fn new(
        inbound: mpsc::UnboundedSender<ControlMessage>,
        reports: mpsc::UnboundedReceiver<ControlReport>,
        timeout: Duration,
    ) -> Self {
        Self {
            inbound,
            reports,
            timeout,
            starts_sent: 0,
        }
    }

    /// Send the start signal. Does not wait for the outcome.
    pub fn send_start(&mut self) -> Result<(), ControlError> {
        self.inbound
            .send(ControlMessage::Start)
            .map_err(|_| ControlError::Closed)?;
        self.starts_sent += 1;
        Ok(())
    }

    /// Wait for the report answering the latest Start, bounded by the
    /// configured timeout.
    ///
    /// Reports produced before that Start reached the core belong to an
    /// earlier request and are discarded.
    pub async fn wait_report(&mut self) -> Result<ControlReport, ControlError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match time::timeout_at(deadline, self.reports.recv()).await {
                Ok(Some(report)) if report.starts_seen < self.starts_sent => {
                    tracing::debug!(
                        succeeded = report.succeeded,
                        starts_seen = report.starts_seen,
                        starts_sent = self.starts_sent,
                        "Discarding stale bring-up report"
                    );
                }
                Ok(Some(report)) => return Ok(report),
                Ok(None) => return Err(ControlError::Closed),
                Err(_) => return Err(ControlError::Timeout(self.timeout)),
            }
        }
    }

    /// Send the start signal and wait for the bring-up outcome.
    pub async fn request_start(&mut self) -> Result<bool, ControlError> {
        self.send_start()?;
        let report = self.wait_report().await?;
        tracing::debug!(succeeded = report.succeeded, "Bring-up report received");
        Ok(report.succeeded)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Starts sent so far.
    pub fn starts_sent(&self) -> u64 {
        self.starts_sent
    }
}
