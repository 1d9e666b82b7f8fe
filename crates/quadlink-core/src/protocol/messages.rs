//! Wire types for the quadruped datagram protocol.
//!
//! Two outbound framings exist.  A *simple* command is always 12 bytes; an
//! *extended* frame carries a variable payload behind a 12-byte header.  The
//! inbound telemetry stream uses a third framing: a 16-byte header followed
//! by a typed payload.  Every multi-byte field is little-endian.

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Size of a simple command on the wire: code, parameter, reserved.
pub const SIMPLE_FRAME_SIZE: usize = 12;

/// Size of the extended frame header: frame kind, code, payload length.
pub const EXTENDED_HEADER_SIZE: usize = 12;

/// Value of the first word of every extended frame.
pub const EXTENDED_FRAME_KIND: u32 = 1;

/// Largest payload an extended frame may carry.
pub const MAX_EXTENDED_PAYLOAD: usize = 64;

/// Size of an [`AxisVector`] payload.
pub const AXIS_VECTOR_SIZE: usize = 16;

/// Size of the telemetry packet header: type tag, length, timestamp.
pub const TELEMETRY_HEADER_SIZE: usize = 16;

/// Size of one [`BatteryTelemetry`] record.
pub const BATTERY_RECORD_SIZE: usize = 16;

/// Size of one [`ImuTelemetry`] record.
pub const IMU_RECORD_SIZE: usize = 36;

/// Size of one [`JointTelemetry`] record.
pub const JOINT_RECORD_SIZE: usize = 16;

// ── Outbound frames ───────────────────────────────────────────────────────────

/// A decoded 12-byte simple command.
///
/// The third wire word is reserved and always zero, so it is not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleCommand {
    /// Firmware opcode.
    pub code: u32,
    /// Signed argument, transmitted as its two's-complement bit pattern.
    pub parameter: i32,
}

/// The fixed part of an extended frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedHeader {
    /// Firmware opcode of the extended command.
    pub code: u32,
    /// Number of payload bytes following the header.
    pub payload_length: u32,
}

/// Four stick axes carried by the extended axis command.
///
/// Values are raw `u32` words in whatever fixed-point convention the caller
/// uses; the codec never scales or clamps them.  Use [`AxisVector::from_signed`]
/// to build a vector from signed stick deflections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisVector {
    pub left_x: u32,
    pub left_y: u32,
    pub right_x: u32,
    pub right_y: u32,
}

impl AxisVector {
    /// All sticks centred. Sending this stops the robot.
    pub const ZERO: AxisVector = AxisVector {
        left_x: 0,
        left_y: 0,
        right_x: 0,
        right_y: 0,
    };

    pub const fn new(left_x: u32, left_y: u32, right_x: u32, right_y: u32) -> Self {
        Self {
            left_x,
            left_y,
            right_x,
            right_y,
        }
    }

    /// Builds a vector from signed deflections, keeping each bit pattern.
    ///
    /// ```rust
    /// use quadlink_core::AxisVector;
    ///
    /// let back = AxisVector::from_signed(0, -500, 0, 0);
    /// assert_eq!(back.left_y, (-500i32) as u32);
    /// ```
    pub const fn from_signed(left_x: i32, left_y: i32, right_x: i32, right_y: i32) -> Self {
        Self {
            left_x: left_x as u32,
            left_y: left_y as u32,
            right_x: right_x as u32,
            right_y: right_y as u32,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Returns the axes in wire order.
    pub fn to_words(&self) -> [u32; 4] {
        [self.left_x, self.left_y, self.right_x, self.right_y]
    }
}

// ── Telemetry ─────────────────────────────────────────────────────────────────

/// Telemetry payload type tags published by the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum TelemetryKind {
    Battery = 0x01,
    Imu = 0x02,
    Joint = 0x03,
    /// Announced by the firmware; no payload layout is published.
    MotionState = 0x04,
    /// Announced by the firmware; no payload layout is published.
    SystemInfo = 0x05,
}

impl TryFrom<u32> for TelemetryKind {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(TelemetryKind::Battery),
            0x02 => Ok(TelemetryKind::Imu),
            0x03 => Ok(TelemetryKind::Joint),
            0x04 => Ok(TelemetryKind::MotionState),
            0x05 => Ok(TelemetryKind::SystemInfo),
            _ => Err(()),
        }
    }
}

/// 16-byte header at the front of every telemetry datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryPacketHeader {
    /// Raw type tag; see [`TelemetryKind`].
    pub type_tag: u32,
    /// Payload length declared by the sender. Not trusted on its own.
    pub length: u32,
    /// Sender timestamp, opaque to this crate.
    pub timestamp: u64,
}

impl TelemetryPacketHeader {
    /// Returns the known kind for this header's tag, if any.
    pub fn kind(&self) -> Option<TelemetryKind> {
        TelemetryKind::try_from(self.type_tag).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryTelemetry {
    pub voltage: f32,
    pub current: f32,
    pub percentage: f32,
    pub temperature: f32,
}

/// Body attitude, angular rate and linear acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuTelemetry {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub gyro_x: f32,
    pub gyro_y: f32,
    pub gyro_z: f32,
    pub acc_x: f32,
    pub acc_y: f32,
    pub acc_z: f32,
}

/// State of one joint. A joint payload holds one record per joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointTelemetry {
    pub position: f32,
    pub velocity: f32,
    pub torque: f32,
    pub temperature: f32,
}
