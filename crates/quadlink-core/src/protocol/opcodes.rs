//! Firmware opcode table and the typed simple-command catalogue.
//!
//! Opcodes are a firmware contract; this module only names them.  Every
//! variant of [`RobotCommand`] resolves to exactly one `(opcode, parameter)`
//! pair and therefore to exactly one 12-byte frame.

use serde::{Deserialize, Serialize};

use crate::protocol::codec::encode_simple;
use crate::protocol::messages::SIMPLE_FRAME_SIZE;

/// Raw opcode values.
pub mod opcode {
    pub const HEARTBEAT: u32 = 0x2104_0001;

    pub const STAND_UP: u32 = 0x2101_0202;
    pub const LIE_DOWN: u32 = 0x2101_0222;
    pub const EMERGENCY_STOP: u32 = 0x2101_0C0E;

    /// Extended frame carrying an [`AxisVector`](crate::AxisVector).
    pub const AXIS_CONTROL: u32 = 0x2101_0140;

    // Older per-axis simple commands; the parameter is the raw stick value.
    pub const LEGACY_LEFT_Y: u32 = 0x2101_0130;
    pub const LEGACY_LEFT_X: u32 = 0x2101_0131;
    pub const LEGACY_RIGHT_X: u32 = 0x2101_0135;

    pub const GAIT_WALK: u32 = 0x2101_0300;
    pub const GAIT_TROT: u32 = 0x2101_0423;
    pub const BODY_HEIGHT: u32 = 0x2101_0406;

    pub const MODE_MANUAL: u32 = 0x2101_0C02;
    pub const MODE_NAVIGATION: u32 = 0x2101_0C03;
    pub const MODE_ASSISTANT: u32 = 0x2101_0C04;

    pub const POWER_DRIVE_MOTOR: u32 = 0x8011_0201;
    pub const POWER_STATUS_QUERY: u32 = 0x8011_0202;
    pub const POWER_LIDAR_FRONT_UPPER: u32 = 0x8011_0501;
    pub const POWER_LIDAR_FRONT_LOWER: u32 = 0x8011_0502;
    pub const POWER_LIDAR_BACK_UPPER: u32 = 0x8011_0503;
    pub const POWER_LIDAR_BACK_LOWER: u32 = 0x8011_0504;
    pub const POWER_PAYLOAD: u32 = 0x8011_0801;

    pub const AUTO_CHARGE: u32 = 0x9191_0250;
}

// ── Command arguments ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gait {
    Walk,
    /// Faster running gait.
    Trot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum HeightTier {
    Low = 0,
    Medium = 1,
    High = 2,
}

/// Who is in charge of locomotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionMode {
    /// Remote-control input drives the robot.
    Manual,
    Navigation,
    Assistant,
}

/// Switchable power rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerDevice {
    DriveMotor,
    LidarFrontUpper,
    LidarFrontLower,
    LidarBackUpper,
    LidarBackLower,
    /// Upper computer and mounted payload.
    Payload,
}

impl PowerDevice {
    pub const ALL: [PowerDevice; 6] = [
        PowerDevice::DriveMotor,
        PowerDevice::LidarFrontUpper,
        PowerDevice::LidarFrontLower,
        PowerDevice::LidarBackUpper,
        PowerDevice::LidarBackLower,
        PowerDevice::Payload,
    ];

    pub fn opcode(self) -> u32 {
        match self {
            PowerDevice::DriveMotor => opcode::POWER_DRIVE_MOTOR,
            PowerDevice::LidarFrontUpper => opcode::POWER_LIDAR_FRONT_UPPER,
            PowerDevice::LidarFrontLower => opcode::POWER_LIDAR_FRONT_LOWER,
            PowerDevice::LidarBackUpper => opcode::POWER_LIDAR_BACK_UPPER,
            PowerDevice::LidarBackLower => opcode::POWER_LIDAR_BACK_LOWER,
            PowerDevice::Payload => opcode::POWER_PAYLOAD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum PowerSwitch {
    Off = 0,
    On = 1,
}

impl From<bool> for PowerSwitch {
    fn from(on: bool) -> Self {
        if on {
            PowerSwitch::On
        } else {
            PowerSwitch::Off
        }
    }
}

/// Note the firmware encodes *start* as 0 and *stop* as 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ChargeAction {
    Start = 0,
    Stop = 1,
}

/// Stick axes addressable by the per-axis simple commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegacyAxis {
    /// Left stick horizontal: strafe.
    LeftX,
    /// Left stick vertical: forward and back.
    LeftY,
    /// Right stick horizontal: turn in place.
    RightX,
}

impl LegacyAxis {
    pub fn opcode(self) -> u32 {
        match self {
            LegacyAxis::LeftX => opcode::LEGACY_LEFT_X,
            LegacyAxis::LeftY => opcode::LEGACY_LEFT_Y,
            LegacyAxis::RightX => opcode::LEGACY_RIGHT_X,
        }
    }
}

// ── RobotCommand ──────────────────────────────────────────────────────────────

/// Every simple command the controller knows how to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotCommand {
    Heartbeat,
    StandUp,
    LieDown,
    EmergencyStop,
    SetGait(Gait),
    SetHeight(HeightTier),
    SetMotionMode(MotionMode),
    SetPower(PowerDevice, PowerSwitch),
    QueryPowerStatus,
    AutoCharge(ChargeAction),
    /// Deflect a single stick axis. A value of 0 recentres it.
    LegacyAxis(LegacyAxis, i32),
}

impl RobotCommand {
    pub fn opcode(&self) -> u32 {
        match self {
            RobotCommand::Heartbeat => opcode::HEARTBEAT,
            RobotCommand::StandUp => opcode::STAND_UP,
            RobotCommand::LieDown => opcode::LIE_DOWN,
            RobotCommand::EmergencyStop => opcode::EMERGENCY_STOP,
            RobotCommand::SetGait(Gait::Walk) => opcode::GAIT_WALK,
            RobotCommand::SetGait(Gait::Trot) => opcode::GAIT_TROT,
            RobotCommand::SetHeight(_) => opcode::BODY_HEIGHT,
            RobotCommand::SetMotionMode(MotionMode::Manual) => opcode::MODE_MANUAL,
            RobotCommand::SetMotionMode(MotionMode::Navigation) => opcode::MODE_NAVIGATION,
            RobotCommand::SetMotionMode(MotionMode::Assistant) => opcode::MODE_ASSISTANT,
            RobotCommand::SetPower(device, _) => device.opcode(),
            RobotCommand::QueryPowerStatus => opcode::POWER_STATUS_QUERY,
            RobotCommand::AutoCharge(_) => opcode::AUTO_CHARGE,
            RobotCommand::LegacyAxis(axis, _) => axis.opcode(),
        }
    }

    pub fn parameter(&self) -> i32 {
        match self {
            RobotCommand::SetHeight(tier) => *tier as i32,
            RobotCommand::SetPower(_, switch) => *switch as i32,
            RobotCommand::AutoCharge(action) => *action as i32,
            RobotCommand::LegacyAxis(_, value) => *value,
            _ => 0,
        }
    }

    /// Encodes the command as a 12-byte simple frame.
    pub fn encode(&self) -> [u8; SIMPLE_FRAME_SIZE] {
        encode_simple(self.opcode(), self.parameter())
    }

    /// Stable lower-case name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            RobotCommand::Heartbeat => "heartbeat",
            RobotCommand::StandUp => "stand_up",
            RobotCommand::LieDown => "lie_down",
            RobotCommand::EmergencyStop => "emergency_stop",
            RobotCommand::SetGait(_) => "set_gait",
            RobotCommand::SetHeight(_) => "set_height",
            RobotCommand::SetMotionMode(_) => "set_motion_mode",
            RobotCommand::SetPower(..) => "set_power",
            RobotCommand::QueryPowerStatus => "query_power_status",
            RobotCommand::AutoCharge(_) => "auto_charge",
            RobotCommand::LegacyAxis(..) => "legacy_axis",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_stand_up_frame_bytes() {
        // Arrange / Act
        let frame = RobotCommand::StandUp.encode();

        // Assert
        assert_eq!(
            frame,
            [0x02, 0x02, 0x01, 0x21, 0, 0, 0, 0, 0, 0, 0, 0],
            "stand-up must encode little-endian with zero parameter and reserved word"
        );
    }

    #[test]
    fn test_height_tier_parameters() {
        assert_eq!(RobotCommand::SetHeight(HeightTier::Low).parameter(), 0);
        assert_eq!(RobotCommand::SetHeight(HeightTier::Medium).parameter(), 1);
        assert_eq!(RobotCommand::SetHeight(HeightTier::High).parameter(), 2);
        assert_eq!(
            RobotCommand::SetHeight(HeightTier::High).opcode(),
            opcode::BODY_HEIGHT
        );
    }

    #[test]
    fn test_charge_start_is_zero_and_stop_is_one() {
        assert_eq!(RobotCommand::AutoCharge(ChargeAction::Start).parameter(), 0);
        assert_eq!(RobotCommand::AutoCharge(ChargeAction::Stop).parameter(), 1);
    }

    #[test]
    fn test_power_switch_from_bool() {
        assert_eq!(PowerSwitch::from(true), PowerSwitch::On);
        assert_eq!(PowerSwitch::from(false), PowerSwitch::Off);
    }

    #[test]
    fn test_every_power_device_has_a_distinct_opcode() {
        // Arrange / Act
        let opcodes: HashSet<u32> = PowerDevice::ALL.iter().map(|d| d.opcode()).collect();

        // Assert
        assert_eq!(opcodes.len(), PowerDevice::ALL.len());
        assert!(!opcodes.contains(&opcode::POWER_STATUS_QUERY));
    }

    #[test]
    fn test_power_command_uses_device_opcode_and_switch_parameter() {
        // Arrange
        let command = RobotCommand::SetPower(PowerDevice::LidarBackLower, PowerSwitch::On);

        // Act
        let frame = command.encode();

        // Assert
        assert_eq!(&frame[0..4], &0x8011_0504u32.to_le_bytes());
        assert_eq!(&frame[4..8], &1u32.to_le_bytes());
    }

    #[test]
    fn test_legacy_axis_negative_value_is_bit_pattern() {
        // Arrange
        let command = RobotCommand::LegacyAxis(LegacyAxis::RightX, -30000);

        // Act
        let frame = command.encode();

        // Assert
        assert_eq!(&frame[0..4], &opcode::LEGACY_RIGHT_X.to_le_bytes());
        assert_eq!(&frame[4..8], &(-30000i32).to_le_bytes());
    }

    #[test]
    fn test_gait_and_mode_opcodes() {
        assert_eq!(RobotCommand::SetGait(Gait::Walk).opcode(), 0x2101_0300);
        assert_eq!(RobotCommand::SetGait(Gait::Trot).opcode(), 0x2101_0423);
        assert_eq!(
            RobotCommand::SetMotionMode(MotionMode::Navigation).opcode(),
            0x2101_0C03
        );
        assert_eq!(RobotCommand::SetGait(Gait::Trot).parameter(), 0);
    }

    #[test]
    fn test_names_are_snake_case() {
        assert_eq!(RobotCommand::EmergencyStop.name(), "emergency_stop");
        assert_eq!(
            RobotCommand::LegacyAxis(LegacyAxis::LeftY, 1).name(),
            "legacy_axis"
        );
    }
}
