//! Infrastructure layer: the UDP sockets.
//!
//! - **`command_channel`** – Outbound command socket, connected to the robot.
//!   Implements [`crate::application::FrameSink`].
//! - **`telemetry`** – Inbound telemetry socket, receive loop and dispatcher.

pub mod command_channel;
pub mod telemetry;

pub use command_channel::{ChannelError, CommandChannel};
pub use telemetry::{
    dispatch_datagram, ReceiverHandle, ReceiverState, ReceiverSummary, TelemetryError,
    TelemetryEvent, TelemetryReceiver,
};
