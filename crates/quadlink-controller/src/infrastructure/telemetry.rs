//! Telemetry receiver and dispatcher.
//!
//! The robot streams its state as UDP datagrams, each a 16-byte header
//! followed by a typed payload.  The receiver owns the listening socket,
//! counts every datagram it receives, and turns each one into zero or more
//! [`TelemetryEvent`]s on an `mpsc` channel:
//!
//! ```text
//! datagram ──► count ──► every 100th? ──► Stats event
//!                  │
//!                  ├─ < 16 bytes ─────────► warn, nothing emitted
//!                  ├─ battery/imu/joint ──► typed event, or DecodeError
//!                  └─ any other tag ──────► Unknown event
//! ```
//!
//! Empty datagrams are ignored and not counted.  Bad datagrams never stop
//! the loop.  Only the owner's cancellation token does, after which the
//! socket is closed and the task ends.
//!
//! Events are handed over with `try_send`, so the loop never waits on the
//! consumer.  When the channel is full the event is dropped and tallied in
//! [`ReceiverSummary::events_dropped`]; counting carries on regardless.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quadlink_core::protocol::decode_telemetry_packet;
use quadlink_core::{
    decode_battery, decode_imu, decode_joints, BatteryTelemetry, ImuTelemetry, JointTelemetry,
    PacketCounter, ProtocolError, TelemetryKind, TelemetryPacketHeader,
};
use serde::Serialize;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Largest datagram the receiver accepts in one read.
pub const RECEIVE_BUFFER_SIZE: usize = 65_535;

/// A stats event is emitted on every n-th datagram.
pub const STATS_EVERY: u64 = 100;

/// Pause after a failed read before trying again.
pub const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The listening socket could not be bound.
    #[error("failed to bind telemetry socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Something the receiver learned from one datagram.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Battery {
        header: TelemetryPacketHeader,
        battery: BatteryTelemetry,
    },
    Imu {
        header: TelemetryPacketHeader,
        imu: ImuTelemetry,
    },
    /// One record per joint; empty when the payload held no whole record.
    Joints {
        header: TelemetryPacketHeader,
        joints: Vec<JointTelemetry>,
    },
    /// A tag with no known payload layout.
    Unknown { type_tag: u32, datagram_len: usize },
    /// A known tag whose payload was too short.
    DecodeError { type_tag: u32, error: ProtocolError },
    /// Running total, emitted before the event of every 100th datagram.
    Stats { total_packets: u64, source: SocketAddr },
}

/// Listening or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReceiverState {
    Listening,
    Stopped,
}

/// Per-kind tallies over a receiver's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiverSummary {
    pub total_packets: u64,
    pub battery: u64,
    pub imu: u64,
    pub joints: u64,
    pub unknown: u64,
    pub decode_errors: u64,
    /// Datagrams shorter than the telemetry header.
    pub short_datagrams: u64,
    /// Events discarded because the consumer's channel was full.
    pub events_dropped: u64,
}

impl ReceiverSummary {
    fn record(&mut self, events: &[TelemetryEvent]) {
        self.total_packets += 1;
        let mut typed = false;
        for event in events {
            match event {
                TelemetryEvent::Battery { .. } => self.battery += 1,
                TelemetryEvent::Imu { .. } => self.imu += 1,
                TelemetryEvent::Joints { .. } => self.joints += 1,
                TelemetryEvent::Unknown { .. } => self.unknown += 1,
                TelemetryEvent::DecodeError { .. } => self.decode_errors += 1,
                TelemetryEvent::Stats { .. } => continue,
            }
            typed = true;
        }
        if !typed {
            self.short_datagrams += 1;
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Turns one datagram into events.
///
/// `count` is the 1-indexed total including this datagram.  A stats event,
/// when due, comes first.  A datagram shorter than the header yields no
/// typed event.
pub fn dispatch_datagram(datagram: &[u8], count: u64, source: SocketAddr) -> Vec<TelemetryEvent> {
    let mut events = Vec::with_capacity(2);

    if count % STATS_EVERY == 0 {
        info!(total_packets = count, %source, "telemetry stats");
        events.push(TelemetryEvent::Stats {
            total_packets: count,
            source,
        });
    }

    let (header, payload) = match decode_telemetry_packet(datagram) {
        Ok(parts) => parts,
        Err(e) => {
            warn!(%source, len = datagram.len(), error = %e, "discarding short telemetry datagram");
            return events;
        }
    };

    let decoded = match header.kind() {
        Some(TelemetryKind::Battery) => {
            decode_battery(payload).map(|battery| TelemetryEvent::Battery { header, battery })
        }
        Some(TelemetryKind::Imu) => {
            decode_imu(payload).map(|imu| TelemetryEvent::Imu { header, imu })
        }
        Some(TelemetryKind::Joint) => Ok(TelemetryEvent::Joints {
            header,
            joints: decode_joints(payload),
        }),
        Some(TelemetryKind::MotionState) | Some(TelemetryKind::SystemInfo) | None => {
            debug!(type_tag = header.type_tag, len = datagram.len(), "telemetry with unknown layout");
            Ok(TelemetryEvent::Unknown {
                type_tag: header.type_tag,
                datagram_len: datagram.len(),
            })
        }
    };

    events.push(decoded.unwrap_or_else(|error| {
        warn!(type_tag = header.type_tag, %error, "telemetry payload decode failed");
        TelemetryEvent::DecodeError {
            type_tag: header.type_tag,
            error,
        }
    }));
    events
}

// ── Receiver ──────────────────────────────────────────────────────────────────

/// A bound telemetry socket that has not started receiving yet.
pub struct TelemetryReceiver {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl TelemetryReceiver {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::BindFailed`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TelemetryError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TelemetryError::BindFailed { addr, source })?;
        let local_addr = socket.local_addr().unwrap_or(addr);
        Ok(Self { socket, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts the receive loop, forwarding events to `events`.
    ///
    /// The loop runs until `shutdown` is cancelled; a dropped or full
    /// `events` receiver does not stop it.
    pub fn spawn(
        self,
        events: mpsc::Sender<TelemetryEvent>,
        shutdown: CancellationToken,
    ) -> ReceiverHandle {
        let counter = Arc::new(PacketCounter::new());
        let listening = Arc::new(AtomicBool::new(true));
        let local_addr = self.local_addr;

        info!(%local_addr, "telemetry receiver listening");

        let join = tokio::spawn(receive_loop(
            self.socket,
            events,
            shutdown.clone(),
            Arc::clone(&counter),
            Arc::clone(&listening),
        ));

        ReceiverHandle {
            shutdown,
            counter,
            listening,
            local_addr,
            join,
        }
    }
}

async fn receive_loop(
    socket: UdpSocket,
    events: mpsc::Sender<TelemetryEvent>,
    shutdown: CancellationToken,
    counter: Arc<PacketCounter>,
    listening: Arc<AtomicBool>,
) -> ReceiverSummary {
    let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];
    let mut summary = ReceiverSummary::default();
    let mut consumer_gone = false;

    loop {
        let (len, source) = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "telemetry receive failed");
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(RECEIVE_ERROR_BACKOFF) => continue,
                    }
                }
            },
        };

        if len == 0 {
            trace!(%source, "ignoring empty telemetry datagram");
            continue;
        }

        let count = counter.increment();
        trace!(count, %source, len, "telemetry datagram");
        let dispatched = dispatch_datagram(&buf[..len], count, source);
        summary.record(&dispatched);

        if consumer_gone {
            continue;
        }
        for event in dispatched {
            match events.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    summary.events_dropped += 1;
                    warn!(
                        count,
                        dropped = summary.events_dropped,
                        "telemetry consumer is behind; event dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("telemetry consumer dropped; still counting datagrams");
                    consumer_gone = true;
                    break;
                }
            }
        }
    }

    listening.store(false, Ordering::Release);
    drop(socket);
    info!(
        total = summary.total_packets,
        decode_errors = summary.decode_errors,
        short = summary.short_datagrams,
        dropped = summary.events_dropped,
        "telemetry receiver stopped"
    );
    summary
}

/// Owner's handle on a running receiver.
pub struct ReceiverHandle {
    shutdown: CancellationToken,
    counter: Arc<PacketCounter>,
    listening: Arc<AtomicBool>,
    local_addr: SocketAddr,
    join: JoinHandle<ReceiverSummary>,
}

impl ReceiverHandle {
    pub fn state(&self) -> ReceiverState {
        if self.listening.load(Ordering::Acquire) {
            ReceiverState::Listening
        } else {
            ReceiverState::Stopped
        }
    }

    /// Datagrams received so far.
    pub fn packets_received(&self) -> u64 {
        self.counter.current()
    }

    pub fn counter(&self) -> Arc<PacketCounter> {
        Arc::clone(&self.counter)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signals shutdown and waits for the loop to close its socket.
    pub async fn stop(self) -> ReceiverSummary {
        self.shutdown.cancel();
        match self.join.await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "telemetry task did not finish cleanly");
                ReceiverSummary {
                    total_packets: self.counter.current(),
                    ..ReceiverSummary::default()
                }
            }
        }
    }
}
