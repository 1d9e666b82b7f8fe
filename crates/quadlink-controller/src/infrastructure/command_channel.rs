//! UDP command channel to the robot.
//!
//! One outbound socket, bound locally and *connected* to the robot's command
//! port.  Connecting a UDP socket does not perform a handshake; it fixes the
//! default destination and makes the kernel drop datagrams from any other
//! peer.  Every [`CommandChannel::send_frame`] call becomes exactly one
//! datagram.  Nothing is buffered, coalesced or retried here.
//!
//! The socket is shared by the heartbeat, axis runs and one-shot commands.
//! `tokio::net::UdpSocket::send` takes `&self` and each call writes one
//! independent datagram, so concurrent senders need no lock.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{info, trace, warn};

use crate::application::transmit::{FrameSink, SendError};

/// Setup errors. Per-datagram failures are [`SendError`]s instead.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The local socket could not be bound.
    #[error("failed to bind command socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The socket could not be associated with the robot address.
    #[error("failed to connect command socket to {peer}: {source}")]
    ConnectFailed {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },
}

pub struct CommandChannel {
    socket: UdpSocket,
    peer: SocketAddr,
    frames_sent: AtomicU64,
}

impl CommandChannel {
    /// Binds `bind_addr` and connects to `peer`.
    ///
    /// Use port 0 in `bind_addr` to let the OS pick the source port.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::BindFailed`] or [`ChannelError::ConnectFailed`].
    pub async fn open(bind_addr: SocketAddr, peer: SocketAddr) -> Result<Self, ChannelError> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| ChannelError::BindFailed {
                addr: bind_addr,
                source,
            })?;
        socket
            .connect(peer)
            .await
            .map_err(|source| ChannelError::ConnectFailed { peer, source })?;

        let local = socket.local_addr().unwrap_or(bind_addr);
        info!(%local, %peer, "command channel open");

        Ok(Self {
            socket,
            peer,
            frames_sent: AtomicU64::new(0),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Datagrams fully handed to the OS so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Sends `frame` as one datagram.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Failed`] if the OS rejects the datagram (an
    /// ICMP "port unreachable" from an earlier datagram also surfaces here)
    /// and [`SendError::Incomplete`] if fewer bytes than `frame.len()` were
    /// written.
    pub async fn send_frame(&self, frame: &[u8]) -> Result<(), SendError> {
        let written = self.socket.send(frame).await.map_err(|source| {
            warn!(peer = %self.peer, error = %source, "datagram send failed");
            SendError::Failed {
                peer: self.peer,
                source,
            }
        })?;

        if written != frame.len() {
            warn!(peer = %self.peer, written, expected = frame.len(), "short datagram send");
            return Err(SendError::Incomplete {
                peer: self.peer,
                written,
                expected: frame.len(),
            });
        }

        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        trace!(peer = %self.peer, len = frame.len(), "datagram sent");
        Ok(())
    }
}

#[async_trait]
impl FrameSink for CommandChannel {
    async fn send(&self, frame: &[u8]) -> Result<(), SendError> {
        self.send_frame(frame).await
    }
}
