//! Liveness keepalive.
//!
//! The robot drops out of remote control when it stops hearing from the
//! controller, so a heartbeat frame goes out at a fixed rate for the whole
//! session, concurrently with any other traffic.  The task never gives up on
//! its own: a failed send is logged and the next beat is attempted on
//! schedule.  Only the session's cancellation token stops it.

use std::sync::Arc;
use std::time::Duration;

use quadlink_core::RobotCommand;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::transmit::FrameSink;

/// 2 Hz.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

/// What the heartbeat did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Beats handed to the sink, successful or not.
    pub beats_attempted: u64,
    pub failures: u64,
}

/// Periodic heartbeat sender.
pub struct HeartbeatTask {
    sink: Arc<dyn FrameSink>,
    interval: Duration,
    cancel: CancellationToken,
}

impl HeartbeatTask {
    /// Creates a heartbeat that stops when `cancel` is cancelled.
    ///
    /// A zero `interval` is raised to one millisecond.
    pub fn new(sink: Arc<dyn FrameSink>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            sink,
            interval: interval.max(Duration::from_millis(1)),
            cancel,
        }
    }

    /// Runs on the current task until cancelled.
    ///
    /// The first beat goes out immediately.  Later beats are spaced one
    /// interval apart; a late beat pushes the schedule back instead of
    /// bursting to catch up.
    pub async fn run(self) -> HeartbeatReport {
        let frame = RobotCommand::Heartbeat.encode();
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut report = HeartbeatReport::default();

        debug!(interval_ms = self.interval.as_millis() as u64, "heartbeat started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            report.beats_attempted += 1;
            if let Err(e) = self.sink.send(&frame).await {
                report.failures += 1;
                warn!(error = %e, beat = report.beats_attempted, "heartbeat send failed");
            }
        }

        debug!(
            beats = report.beats_attempted,
            failures = report.failures,
            "heartbeat stopped"
        );
        report
    }

    /// Spawns the heartbeat onto the Tokio runtime.
    pub fn spawn(self) -> HeartbeatHandle {
        let cancel = self.cancel.clone();
        let join = tokio::spawn(self.run());
        info!("heartbeat task spawned");
        HeartbeatHandle { cancel, join }
    }
}

/// Owner's handle on a spawned heartbeat.
pub struct HeartbeatHandle {
    cancel: CancellationToken,
    join: JoinHandle<HeartbeatReport>,
}

impl HeartbeatHandle {
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Cancels the heartbeat and waits for the task to exit.
    ///
    /// Returns once no further heartbeat can be sent, so the caller may
    /// release the command channel afterwards.
    pub async fn stop(self) -> HeartbeatReport {
        self.cancel.cancel();
        match self.join.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "heartbeat task did not finish cleanly");
                HeartbeatReport::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::transmit::testing::RecordingSink;
    use crate::application::transmit::MockFrameSink;
    use tokio::time::Instant;

    fn spawn_with(sink: Arc<RecordingSink>, interval: Duration) -> HeartbeatHandle {
        HeartbeatTask::new(sink as Arc<dyn FrameSink>, interval, CancellationToken::new()).spawn()
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_sends_immediately_then_every_interval() {
        // Arrange
        let sink = Arc::new(RecordingSink::default());
        let handle = spawn_with(Arc::clone(&sink), DEFAULT_HEARTBEAT_INTERVAL);

        // Act – beats due at 0, 500 and 1000 ms
        time::sleep(Duration::from_millis(1250)).await;
        let report = handle.stop().await;

        // Assert
        assert_eq!(report.beats_attempted, 3);
        assert_eq!(report.failures, 0);
        let frames = sink.frames();
        assert_eq!(frames.len(), 3);
        for frame in &frames {
            assert_eq!(frame.as_slice(), &RobotCommand::Heartbeat.encode());
        }
        for pair in sink.timestamps().windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(500) && gap < Duration::from_millis(510));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_survives_send_failures() {
        // Arrange
        let sink = Arc::new(RecordingSink::failing());
        let handle = spawn_with(Arc::clone(&sink), DEFAULT_HEARTBEAT_INTERVAL);

        // Act
        time::sleep(Duration::from_millis(1100)).await;
        let still_running = handle.is_running();
        sink.set_failing(false);
        time::sleep(Duration::from_millis(500)).await;
        let report = handle.stop().await;

        // Assert
        assert!(still_running, "failures must not stop the heartbeat");
        assert_eq!(report.failures, 3);
        assert_eq!(report.beats_attempted, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_returns_well_within_one_interval() {
        // Arrange
        let sink = Arc::new(RecordingSink::default());
        let handle = spawn_with(Arc::clone(&sink), DEFAULT_HEARTBEAT_INTERVAL);
        time::sleep(Duration::from_millis(10)).await;

        // Act
        let started = Instant::now();
        let report = handle.stop().await;

        // Assert
        assert!(started.elapsed() < DEFAULT_HEARTBEAT_INTERVAL);
        assert_eq!(report.beats_attempted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_cancellation_ends_task() {
        // Arrange
        let token = CancellationToken::new();
        let sink = Arc::new(RecordingSink::default());
        let handle = HeartbeatTask::new(
            Arc::clone(&sink) as Arc<dyn FrameSink>,
            DEFAULT_HEARTBEAT_INTERVAL,
            token.clone(),
        )
        .spawn();
        time::sleep(Duration::from_millis(600)).await;

        // Act
        token.cancel();
        time::sleep(Duration::from_millis(1)).await;

        // Assert
        assert!(!handle.is_running());
        let sent_before = sink.frames().len();
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.frames().len(), sent_before, "no beats after cancellation");
        assert_eq!(handle.stop().await.beats_attempted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_frame_reaches_sink_exactly() {
        // Arrange
        let mut mock = MockFrameSink::new();
        mock.expect_send()
            .withf(|frame| frame.to_vec() == RobotCommand::Heartbeat.encode().to_vec())
            .times(1)
            .returning(|_| Ok(()));
        let handle = HeartbeatTask::new(
            Arc::new(mock) as Arc<dyn FrameSink>,
            DEFAULT_HEARTBEAT_INTERVAL,
            CancellationToken::new(),
        )
        .spawn();

        // Act
        time::sleep(Duration::from_millis(100)).await;
        let report = handle.stop().await;

        // Assert
        assert_eq!(report.beats_attempted, 1);
    }
}
