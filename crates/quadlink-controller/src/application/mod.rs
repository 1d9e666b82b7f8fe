//! Application layer use cases for the controller.
//!
//! # What use cases does the controller have?
//!
//! - **`heartbeat`** – Keeps the robot's remote-control link alive by sending
//!   a heartbeat frame at a fixed rate until the session ends.
//!
//! - **`axis_stream`** – Applies a stick position for a bounded time by
//!   resending an extended axis frame every tick, then sends the all-zero
//!   stop frame exactly once.
//!
//! - **`robot`** – Named one-shot commands (stand, lie down, gait, power, …)
//!   plus the two motion paths.
//!
//! - **`session`** – Ties the above to one cancellation token and one
//!   session id.
//!
//! None of these modules touch sockets.  They send through the [`FrameSink`]
//! trait, which the infrastructure layer implements over UDP and the tests
//! implement with recording doubles.

pub mod axis_stream;
pub mod heartbeat;
pub mod robot;
pub mod session;
pub mod transmit;

pub use axis_stream::{AxisStreamer, StreamReport, DEFAULT_AXIS_TICK};
pub use heartbeat::{HeartbeatHandle, HeartbeatReport, HeartbeatTask, DEFAULT_HEARTBEAT_INTERVAL};
pub use robot::{HoldReport, RobotController};
pub use session::{Session, SessionOptions, SessionSummary};
pub use transmit::{FrameSink, SendError};
