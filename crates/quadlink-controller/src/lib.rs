//! # quadlink-controller
//!
//! Drives a legged robot over its UDP remote-control protocol: a heartbeat
//! that keeps the link alive, one-shot commands, bounded axis streaming that
//! always ends with a stop frame, and a telemetry receiver.
//!
//! # Architecture overview
//!
//! ```text
//! application/     heartbeat, axis streaming, named commands, sessions
//!       │            (send through the FrameSink trait, no sockets)
//!       ▼
//! infrastructure/  CommandChannel (outbound UDP), TelemetryReceiver (inbound UDP)
//!       │
//!       ▼
//! quadlink-core    frame and telemetry codec
//! ```
//!
//! `config` loads the TOML settings used by the `quadlink` binary.

pub mod application;
pub mod config;
pub mod infrastructure;
