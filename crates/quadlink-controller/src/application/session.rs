//! A control session: one robot, one heartbeat, one cancellation token.
//!
//! Opening a session starts the heartbeat immediately.  Everything started
//! through the session (axis runs, legacy holds) listens to a child of the
//! session token, so cancelling the session stops them too, stop frames
//! included.  [`Session::shutdown`] returns only after the heartbeat task has
//! exited, which is the point at which the caller may drop the channel.

use std::sync::Arc;
use std::time::Duration;

use quadlink_core::protocol::LegacyAxis;
use quadlink_core::AxisVector;
use tokio::time::{self, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::info;
use uuid::Uuid;

use crate::application::axis_stream::{StreamReport, DEFAULT_AXIS_TICK};
use crate::application::heartbeat::{
    HeartbeatHandle, HeartbeatReport, HeartbeatTask, DEFAULT_HEARTBEAT_INTERVAL,
};
use crate::application::robot::{HoldReport, RobotController};
use crate::application::transmit::FrameSink;

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub heartbeat_interval: Duration,
    pub axis_tick: Duration,
    /// Pause after the first heartbeat before [`Session::start`] returns.
    pub warmup: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            axis_tick: DEFAULT_AXIS_TICK,
            warmup: Duration::ZERO,
        }
    }
}

/// Returned by [`Session::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub heartbeat: HeartbeatReport,
    pub uptime: Duration,
}

pub struct Session {
    id: Uuid,
    robot: RobotController,
    heartbeat: HeartbeatHandle,
    token: CancellationToken,
    started_at: Instant,
    // Cancels the heartbeat if the session is dropped without `shutdown`.
    _cancel_on_drop: DropGuard,
}

impl Session {
    /// Starts the heartbeat on `sink` and waits out the warm-up period.
    pub async fn start(sink: Arc<dyn FrameSink>, options: SessionOptions) -> Self {
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        let heartbeat = HeartbeatTask::new(
            Arc::clone(&sink),
            options.heartbeat_interval,
            token.clone(),
        )
        .spawn();
        let robot = RobotController::new(sink, options.axis_tick);

        info!(session_id = %id, "session started");

        if !options.warmup.is_zero() {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(options.warmup) => {}
            }
        }

        Self {
            id,
            robot,
            heartbeat,
            _cancel_on_drop: token.clone().drop_guard(),
            token,
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn robot(&self) -> &RobotController {
        &self.robot
    }

    /// Token that ends the session's activity when cancelled, e.g. from a
    /// Ctrl+C handler.  [`Session::shutdown`] is still needed to join the
    /// heartbeat.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat.is_running()
    }

    /// Streams `axis` for `duration`; cancelled with the session.
    pub async fn drive(&self, axis: AxisVector, duration: Duration) -> StreamReport {
        let cancel = self.token.child_token();
        self.robot.drive(axis, duration, &cancel).await
    }

    /// Legacy single-axis hold; cancelled with the session.
    pub async fn hold_legacy_axis(
        &self,
        axis: LegacyAxis,
        value: i32,
        duration: Duration,
    ) -> HoldReport {
        let cancel = self.token.child_token();
        self.robot
            .hold_legacy_axis(axis, value, duration, &cancel)
            .await
    }

    /// Keeps the heartbeat alive for `duration` or until the session is cancelled.
    pub async fn idle(&self, duration: Duration) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = time::sleep(duration) => {}
        }
    }

    /// Cancels the session and waits for the heartbeat to exit.
    pub async fn shutdown(self) -> SessionSummary {
        self.token.cancel();
        let heartbeat = self.heartbeat.stop().await;
        let summary = SessionSummary {
            session_id: self.id,
            heartbeat,
            uptime: self.started_at.elapsed(),
        };
        info!(
            session_id = %summary.session_id,
            beats = heartbeat.beats_attempted,
            failures = heartbeat.failures,
            uptime_ms = summary.uptime.as_millis() as u64,
            "session closed"
        );
        summary
    }
}
