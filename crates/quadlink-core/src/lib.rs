//! # quadlink-core
//!
//! Shared library for the quadruped control link containing the binary frame
//! codec, the typed command catalogue and the telemetry decoders.
//!
//! This crate is used by the controller and by anything that needs to speak
//! the robot's datagram protocol (simulators, capture tools, benchmarks).
//! It has zero dependencies on OS APIs or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! The robot listens for small fixed-layout UDP datagrams and streams its own
//! state back the same way.  Nothing is acknowledged: a lost datagram is simply
//! gone, which is why the controller keeps a heartbeat running and resends axis
//! frames every tick instead of sending a single "move" request.
//!
//! - **`protocol::messages`** – The shapes on the wire: the 12-byte simple
//!   command, the extended frame header, the 16-byte axis vector and the
//!   telemetry header and records.
//!
//! - **`protocol::opcodes`** – The firmware's opcode table and [`RobotCommand`],
//!   a typed name for every simple command the robot understands.
//!
//! - **`protocol::codec`** – Little-endian encode/decode for all of the above.
//!
//! - **`protocol::payload`** – A capacity-bounded staging buffer for extended
//!   frame payloads.
//!
//! - **`protocol::counter`** – The atomic packet counter shared between the
//!   telemetry receiver and its observers.

pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `quadlink_core::AxisVector` instead of `quadlink_core::protocol::messages::AxisVector`.
pub use protocol::codec::{
    decode_battery, decode_extended_header, decode_imu, decode_joints, decode_simple,
    decode_telemetry_header, encode_axis, encode_extended, encode_extended_staged, encode_simple,
    ProtocolError,
};
pub use protocol::counter::PacketCounter;
pub use protocol::messages::{
    AxisVector, BatteryTelemetry, ImuTelemetry, JointTelemetry, TelemetryKind,
    TelemetryPacketHeader,
};
pub use protocol::opcodes::RobotCommand;
pub use protocol::payload::PayloadBuffer;
