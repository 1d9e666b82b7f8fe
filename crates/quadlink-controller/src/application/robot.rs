//! RobotController: named robot operations on top of a [`FrameSink`].
//!
//! One-shot commands encode a [`RobotCommand`] and send it once.  Motion goes
//! through the [`AxisStreamer`] (extended axis frames at a fixed rate) or the
//! older per-axis scheme in [`RobotController::hold_legacy_axis`].  Both motion
//! paths end with a stop frame no matter how they end.

use std::sync::Arc;
use std::time::Duration;

use quadlink_core::protocol::{ChargeAction, Gait, HeightTier, LegacyAxis, MotionMode, PowerDevice};
use quadlink_core::{AxisVector, RobotCommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::axis_stream::{AxisStreamer, StopGuard, StreamReport};
use crate::application::transmit::{FrameSink, SendError};

/// Outcome of a legacy single-axis hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldReport {
    pub command_sent: bool,
    pub cancelled: bool,
    /// The recentring command was accepted by the sink.
    pub stop_sent: bool,
}

/// Sends commands to one robot.
#[derive(Clone)]
pub struct RobotController {
    sink: Arc<dyn FrameSink>,
    streamer: AxisStreamer,
}

impl RobotController {
    pub fn new(sink: Arc<dyn FrameSink>, axis_tick: Duration) -> Self {
        let streamer = AxisStreamer::new(Arc::clone(&sink), axis_tick);
        Self { sink, streamer }
    }

    /// Sends one simple command.
    ///
    /// # Errors
    ///
    /// Returns the [`SendError`] after logging it.  Nothing is retried.
    pub async fn execute(&self, command: RobotCommand) -> Result<(), SendError> {
        match self.sink.send(&command.encode()).await {
            Ok(()) => {
                debug!(
                    command = command.name(),
                    opcode = %format!("{:#010x}", command.opcode()),
                    parameter = command.parameter(),
                    "command sent"
                );
                Ok(())
            }
            Err(e) => {
                warn!(command = command.name(), error = %e, "command send failed");
                Err(e)
            }
        }
    }

    pub async fn stand_up(&self) -> Result<(), SendError> {
        self.execute(RobotCommand::StandUp).await
    }

    pub async fn lie_down(&self) -> Result<(), SendError> {
        self.execute(RobotCommand::LieDown).await
    }

    pub async fn emergency_stop(&self) -> Result<(), SendError> {
        self.execute(RobotCommand::EmergencyStop).await
    }

    pub async fn set_gait(&self, gait: Gait) -> Result<(), SendError> {
        self.execute(RobotCommand::SetGait(gait)).await
    }

    pub async fn set_height(&self, tier: HeightTier) -> Result<(), SendError> {
        self.execute(RobotCommand::SetHeight(tier)).await
    }

    pub async fn set_motion_mode(&self, mode: MotionMode) -> Result<(), SendError> {
        self.execute(RobotCommand::SetMotionMode(mode)).await
    }

    pub async fn set_power(&self, device: PowerDevice, on: bool) -> Result<(), SendError> {
        self.execute(RobotCommand::SetPower(device, on.into())).await
    }

    /// Asks the robot to report its power rail state on the telemetry stream.
    pub async fn query_power_status(&self) -> Result<(), SendError> {
        self.execute(RobotCommand::QueryPowerStatus).await
    }

    pub async fn start_auto_charge(&self) -> Result<(), SendError> {
        self.execute(RobotCommand::AutoCharge(ChargeAction::Start)).await
    }

    pub async fn stop_auto_charge(&self) -> Result<(), SendError> {
        self.execute(RobotCommand::AutoCharge(ChargeAction::Stop)).await
    }

    /// Streams `axis` for `duration` and then stops. See [`AxisStreamer::run`].
    pub async fn drive(
        &self,
        axis: AxisVector,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> StreamReport {
        self.streamer.run(axis, duration, cancel).await
    }

    /// Deflects one stick axis with a single command, holds it, then recentres.
    ///
    /// The firmware keeps applying the last per-axis value it received, so
    /// only two frames go out: `value` at the start and `0` at the end.  The
    /// recentring frame is sent even when cancelled or dropped mid-hold.
    pub async fn hold_legacy_axis(
        &self,
        axis: LegacyAxis,
        value: i32,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> HoldReport {
        let mut guard = StopGuard::arm(
            Arc::clone(&self.sink),
            RobotCommand::LegacyAxis(axis, 0).encode().to_vec(),
        );
        let mut report = HoldReport::default();

        info!(?axis, value, duration_ms = duration.as_millis() as u64, "legacy axis hold");
        report.command_sent = self
            .execute(RobotCommand::LegacyAxis(axis, value))
            .await
            .is_ok();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => report.cancelled = true,
            _ = tokio::time::sleep(duration) => {}
        }

        report.stop_sent = guard.fire().await;
        report
    }
}
