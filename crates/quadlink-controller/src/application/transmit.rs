//! The outbound seam between the use cases and the network.
//!
//! Everything that transmits (heartbeat, axis streaming, one-shot commands)
//! talks to a [`FrameSink`].  The UDP implementation lives in
//! `infrastructure::command_channel`; tests inject recording doubles.

use std::net::SocketAddr;

use async_trait::async_trait;
use thiserror::Error;

/// A single datagram could not be handed to the OS.
///
/// Never fatal: callers log it and carry on.  Retrying is the caller's call.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("send to {peer} failed: {source}")]
    Failed {
        peer: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("short send to {peer}: wrote {written} of {expected} bytes")]
    Incomplete {
        peer: SocketAddr,
        written: usize,
        expected: usize,
    },
}

/// Sends one already-encoded frame as one datagram.
///
/// Implementations must be safe to call from several tasks at once; each call
/// is independent and no frames are buffered or coalesced.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn send(&self, frame: &[u8]) -> Result<(), SendError>;
}
