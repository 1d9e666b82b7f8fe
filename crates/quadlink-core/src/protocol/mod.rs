//! Protocol module containing wire types, the opcode table and the binary codec.

pub mod codec;
pub mod counter;
pub mod messages;
pub mod opcodes;
pub mod payload;

pub use codec::{
    decode_axis_payload, decode_battery, decode_extended, decode_extended_header, decode_imu,
    decode_joints, decode_simple, decode_telemetry_header, decode_telemetry_packet, encode_axis,
    encode_extended, encode_extended_staged, encode_simple, encode_telemetry_packet,
    ProtocolError,
};
pub use counter::PacketCounter;
pub use messages::*;
pub use opcodes::{
    opcode, ChargeAction, Gait, HeightTier, LegacyAxis, MotionMode, PowerDevice, PowerSwitch,
    RobotCommand,
};
pub use payload::PayloadBuffer;
