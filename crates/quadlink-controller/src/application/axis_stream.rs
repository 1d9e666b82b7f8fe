//! Bounded-duration axis streaming.
//!
//! The robot only keeps moving while it keeps receiving axis frames, so
//! "walk forward for two seconds" becomes "send the same axis frame every
//! tick for two seconds, then send all-zero axes".  The zero frame is the
//! important part: it goes out exactly once at the end of every run, whether
//! the run completed, was cancelled, or its future was dropped.

use std::sync::Arc;
use std::time::Duration;

use quadlink_core::{encode_axis, AxisVector};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::transmit::FrameSink;

/// 100 Hz.
pub const DEFAULT_AXIS_TICK: Duration = Duration::from_millis(10);

/// Outcome of one axis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamReport {
    /// `duration / tick`, rounded down.
    pub ticks_planned: u64,
    /// Axis frames accepted by the sink.
    pub frames_sent: u64,
    pub send_failures: u64,
    /// The run ended early because its token was cancelled.
    pub cancelled: bool,
    /// The terminating zero frame was accepted by the sink.
    pub stop_sent: bool,
}

/// Streams an axis frame at a fixed rate.
#[derive(Clone)]
pub struct AxisStreamer {
    sink: Arc<dyn FrameSink>,
    tick: Duration,
}

impl AxisStreamer {
    /// A zero `tick` is raised to one millisecond.
    pub fn new(sink: Arc<dyn FrameSink>, tick: Duration) -> Self {
        Self {
            sink,
            tick: tick.max(Duration::from_millis(1)),
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Number of axis frames a run of `duration` sends.
    pub fn planned_ticks(&self, duration: Duration) -> u64 {
        (duration.as_nanos() / self.tick.as_nanos()) as u64
    }

    /// Applies `target` for `duration`, then stops the robot.
    ///
    /// Each tick sends the axis frame and then waits one tick.  Cancellation
    /// is checked between ticks and interrupts the wait, so the run ends at
    /// most one tick after `cancel` fires.  A failed send is logged and the
    /// run continues.  The zero frame is sent regardless of earlier failures.
    pub async fn run(
        &self,
        target: AxisVector,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> StreamReport {
        let ticks_planned = self.planned_ticks(duration);
        let mut report = StreamReport {
            ticks_planned,
            ..StreamReport::default()
        };
        let frame = encode_axis(&target);
        let mut guard = StopGuard::arm(
            Arc::clone(&self.sink),
            encode_axis(&AxisVector::ZERO),
        );

        info!(
            ?target,
            duration_ms = duration.as_millis() as u64,
            ticks = ticks_planned,
            "axis run started"
        );

        let mut ticker = time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        for tick in 0..ticks_planned {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self.sink.send(&frame).await {
                Ok(()) => report.frames_sent += 1,
                Err(e) => {
                    report.send_failures += 1;
                    warn!(error = %e, tick, "axis frame send failed");
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                _ = ticker.tick() => {}
            }
        }

        report.stop_sent = guard.fire().await;

        info!(
            frames = report.frames_sent,
            failures = report.send_failures,
            cancelled = report.cancelled,
            stop_sent = report.stop_sent,
            "axis run finished"
        );
        report
    }
}

/// Sends a stop frame exactly once: either through [`StopGuard::fire`] or,
/// if the owning future is dropped first, from a task spawned on drop.
pub(crate) struct StopGuard {
    sink: Option<Arc<dyn FrameSink>>,
    frame: Vec<u8>,
}

impl StopGuard {
    pub(crate) fn arm(sink: Arc<dyn FrameSink>, frame: Vec<u8>) -> Self {
        Self {
            sink: Some(sink),
            frame,
        }
    }

    /// Sends the stop frame now and disarms the guard.
    ///
    /// If this future is dropped before the send completes the guard stays
    /// armed and the drop path sends it instead.
    pub(crate) async fn fire(&mut self) -> bool {
        let Some(sink) = self.sink.as_ref() else {
            return false;
        };
        let sent = send_stop(sink.as_ref(), &self.frame).await;
        self.sink = None;
        sent
    }
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        let frame = std::mem::take(&mut self.frame);
        match Handle::try_current() {
            Ok(handle) => {
                debug!("axis run dropped mid-flight; sending stop frame from a new task");
                handle.spawn(async move {
                    send_stop(sink.as_ref(), &frame).await;
                });
            }
            Err(_) => error!("axis run dropped outside a Tokio runtime; stop frame not sent"),
        }
    }
}

async fn send_stop(sink: &dyn FrameSink, frame: &[u8]) -> bool {
    match sink.send(frame).await {
        Ok(()) => {
            debug!("stop frame sent");
            true
        }
        Err(e) => {
            warn!(error = %e, "stop frame send failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::transmit::testing::RecordingSink;

    fn streamer(sink: &Arc<RecordingSink>) -> AxisStreamer {
        AxisStreamer::new(Arc::clone(sink) as Arc<dyn FrameSink>, DEFAULT_AXIS_TICK)
    }

    fn zero_count(axes: &[AxisVector]) -> usize {
        axes.iter().filter(|a| a.is_zero()).count()
    }

    #[test]
    fn test_planned_ticks_rounds_down() {
        let sink = Arc::new(RecordingSink::default());
        let s = streamer(&sink);
        assert_eq!(s.planned_ticks(Duration::from_millis(20)), 2);
        assert_eq!(s.planned_ticks(Duration::from_millis(29)), 2);
        assert_eq!(s.planned_ticks(Duration::from_millis(9)), 0);
        assert_eq!(s.planned_ticks(Duration::from_secs(2)), 200);
    }

    #[test]
    fn test_zero_tick_is_raised_to_one_millisecond() {
        let sink = Arc::new(RecordingSink::default());

        let s = AxisStreamer::new(Arc::clone(&sink) as Arc<dyn FrameSink>, Duration::ZERO);

        assert_eq!(s.tick(), Duration::from_millis(1));
        assert_eq!(s.planned_ticks(Duration::from_millis(5)), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_twenty_ms_run_sends_two_axis_frames_then_one_stop() {
        // Arrange
        let sink = Arc::new(RecordingSink::default());
        let target = AxisVector::new(500, 0, 0, 0);

        // Act
        let report = streamer(&sink)
            .run(target, Duration::from_millis(20), &CancellationToken::new())
            .await;

        // Assert
        assert_eq!(sink.frames().len(), 3);
        assert_eq!(sink.axis_frames(), vec![target, target, AxisVector::ZERO]);
        assert_eq!(
            report,
            StreamReport {
                ticks_planned: 2,
                frames_sent: 2,
                send_failures: 0,
                cancelled: false,
                stop_sent: true,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_are_one_tick_apart() {
        // Arrange
        let sink = Arc::new(RecordingSink::default());

        // Act
        streamer(&sink)
            .run(AxisVector::new(0, 300, 0, 0), Duration::from_millis(50), &CancellationToken::new())
            .await;

        // Assert
        let stamps = sink.timestamps();
        assert_eq!(stamps.len(), 6);
        for pair in stamps.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= DEFAULT_AXIS_TICK && gap < DEFAULT_AXIS_TICK * 2, "gap {gap:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_sends_only_stop_frame() {
        let sink = Arc::new(RecordingSink::default());

        let report = streamer(&sink)
            .run(AxisVector::new(1, 1, 1, 1), Duration::ZERO, &CancellationToken::new())
            .await;

        assert_eq!(sink.axis_frames(), vec![AxisVector::ZERO]);
        assert_eq!(report.frames_sent, 0);
        assert!(report.stop_sent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_mid_run_stops_within_one_tick() {
        // Arrange
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(35)).await;
            canceller.cancel();
        });
        let started = time::Instant::now();

        // Act
        let report = streamer(&sink)
            .run(AxisVector::new(500, 0, 0, 0), Duration::from_secs(10), &cancel)
            .await;

        // Assert – frames at 0, 10, 20 and 30 ms, then the stop frame at 35 ms
        assert!(report.cancelled);
        assert_eq!(report.frames_sent, 4);
        let axes = sink.axis_frames();
        assert_eq!(zero_count(&axes), 1);
        assert!(axes.last().unwrap().is_zero());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(35) && elapsed < Duration::from_millis(45));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_token_still_sends_stop() {
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = streamer(&sink)
            .run(AxisVector::new(500, 0, 0, 0), Duration::from_secs(1), &cancel)
            .await;

        assert!(report.cancelled);
        assert_eq!(sink.axis_frames(), vec![AxisVector::ZERO]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failures_do_not_prevent_stop_attempt() {
        // Arrange
        let sink = Arc::new(RecordingSink::failing());

        // Act
        let report = streamer(&sink)
            .run(AxisVector::new(500, 0, 0, 0), Duration::from_millis(30), &CancellationToken::new())
            .await;

        // Assert
        assert_eq!(report.send_failures, 3);
        assert_eq!(report.frames_sent, 0);
        assert!(!report.stop_sent);
        let axes = sink.axis_frames();
        assert_eq!(axes.len(), 4);
        assert!(axes[3].is_zero(), "stop frame must still be attempted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_sends_stop_exactly_once() {
        // Arrange
        let sink = Arc::new(RecordingSink::default());
        let s = streamer(&sink);
        let cancel = CancellationToken::new();

        // Act – the timeout drops the run future mid-stream
        let result = time::timeout(
            Duration::from_millis(25),
            s.run(AxisVector::new(500, 0, 0, 0), Duration::from_secs(5), &cancel),
        )
        .await;
        time::sleep(Duration::from_millis(1)).await;

        // Assert
        assert!(result.is_err());
        let axes = sink.axis_frames();
        assert_eq!(axes.len(), 4, "three axis frames then the stop frame");
        assert_eq!(zero_count(&axes), 1);
        assert!(axes.last().unwrap().is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_guard_does_not_send_again_on_drop() {
        // Arrange
        let sink = Arc::new(RecordingSink::default());
        let mut guard = StopGuard::arm(
            Arc::clone(&sink) as Arc<dyn FrameSink>,
            encode_axis(&AxisVector::ZERO),
        );

        // Act
        assert!(guard.fire().await);
        drop(guard);
        time::sleep(Duration::from_millis(1)).await;

        // Assert
        assert_eq!(sink.frames().len(), 1);
    }
}
