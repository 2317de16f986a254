// THEORY:
// The `session` module wraps the pipeline in an actor task. All cycle-to-cycle
// state (debounce counters, the anchor, the trace writer) is owned by a single
// tokio task that consumes commands from a channel, so cycles are serialized by
// construction: a new cycle cannot touch filter state before the previous one
// has replied. Callers hold a cheap cloneable handle and await replies over
// oneshot channels.
//
// The session also owns the clock. Fixes are stamped with time since session
// start, and the operator can rebase that clock when attaching to a stream that
// has already been running for a while.

use crate::error::{Result, TrailError};
use crate::pipeline::{CycleReport, TrackingPipeline};
use image::GrayImage;
use log::warn;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

/// Commands understood by the session task.
enum SessionMessage {
    Cycle(GrayImage, oneshot::Sender<Result<CycleReport>>),
    OverrideAnchor { pixel_x: u32, pixel_y: u32 },
    RebaseClock(Duration),
    Shutdown,
}

/// Handle to a running tracking session. Dropping the handle shuts the
/// session down.
pub struct TrackingSession {
    tx: mpsc::Sender<SessionMessage>,
}

impl TrackingSession {
    /// Spawns the session task. The pipeline moves into the task and is never
    /// touched from anywhere else.
    pub fn spawn(mut pipeline: TrackingPipeline) -> Self {
        let (tx, mut rx) = mpsc::channel::<SessionMessage>(1);

        tokio::spawn(async move {
            let mut start = Instant::now();

            while let Some(message) = rx.recv().await {
                match message {
                    SessionMessage::Cycle(frame, reply) => {
                        let report = pipeline.process_cycle(&frame, start.elapsed());
                        let _ = reply.send(report);
                    }
                    SessionMessage::OverrideAnchor { pixel_x, pixel_y } => {
                        pipeline.override_anchor(pixel_x, pixel_y, start.elapsed());
                    }
                    SessionMessage::RebaseClock(elapsed) => {
                        match Instant::now().checked_sub(elapsed) {
                            Some(rebased) => start = rebased,
                            None => warn!("cannot rebase session clock by {elapsed:?}"),
                        }
                    }
                    SessionMessage::Shutdown => break,
                }
            }
        });

        Self { tx }
    }

    /// Submits one normalized frame and waits for the cycle's report.
    pub async fn process(&self, frame: GrayImage) -> Result<CycleReport> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionMessage::Cycle(frame, reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| TrailError::Session("session dropped the cycle".into()))?
    }

    /// Plants the anchor at a map pixel coordinate immediately.
    pub async fn override_anchor(&self, pixel_x: u32, pixel_y: u32) -> Result<()> {
        self.send(SessionMessage::OverrideAnchor { pixel_x, pixel_y })
            .await
    }

    /// Rebases the session clock so that `elapsed` has already passed, for
    /// attaching to a stream that started earlier.
    pub async fn rebase_clock(&self, elapsed: Duration) -> Result<()> {
        self.send(SessionMessage::RebaseClock(elapsed)).await
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(SessionMessage::Shutdown).await;
    }

    async fn send(&self, message: SessionMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| TrailError::Session("tracking session has terminated".into()))
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        // Best effort shutdown on drop.
        let _ = self.tx.try_send(SessionMessage::Shutdown);
    }
}
