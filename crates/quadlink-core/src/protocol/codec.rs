//! Binary codec for the quadruped datagram protocol.
//!
//! Wire formats (all fields little-endian):
//! ```text
//! simple:     [code:u32][parameter:u32][reserved=0:u32]               12 bytes
//! extended:   [kind=1:u32][code:u32][len:u32][payload:len]            12 + len bytes
//! telemetry:  [type_tag:u32][length:u32][timestamp:u64][payload:N]    16 + N bytes
//! ```
//! Telemetry floats are IEEE-754 binary32.

use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::protocol::messages::{
    AxisVector, BatteryTelemetry, ExtendedHeader, ImuTelemetry, JointTelemetry, SimpleCommand,
    TelemetryPacketHeader, AXIS_VECTOR_SIZE, BATTERY_RECORD_SIZE, EXTENDED_FRAME_KIND,
    EXTENDED_HEADER_SIZE, IMU_RECORD_SIZE, JOINT_RECORD_SIZE, SIMPLE_FRAME_SIZE,
    TELEMETRY_HEADER_SIZE,
};
use crate::protocol::opcodes::opcode;
use crate::protocol::payload::PayloadBuffer;

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum ProtocolError {
    /// An extended payload exceeds the staging limit. Nothing was encoded.
    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    /// A command frame is shorter than its fixed header.
    #[error("truncated frame: need {needed} bytes, got {available}")]
    TruncatedFrame { needed: usize, available: usize },

    /// The first word of an extended frame is not the extended marker.
    #[error("unexpected frame kind {0}, expected 1")]
    UnexpectedFrameKind(u32),

    /// A telemetry datagram is shorter than the 16-byte header.
    #[error("truncated telemetry header: need {needed} bytes, got {available}")]
    TruncatedHeader { needed: usize, available: usize },

    /// A payload is shorter than the fixed record for its type.
    #[error("truncated {kind} payload: need {needed} bytes, got {available}")]
    TruncatedPayload {
        kind: &'static str,
        needed: usize,
        available: usize,
    },
}

// ── Command encoding ──────────────────────────────────────────────────────────

/// Encodes a 12-byte simple command.
///
/// `parameter` is written as its two's-complement bit pattern, so negative
/// values survive the trip unchanged.
///
/// # Examples
///
/// ```rust
/// use quadlink_core::encode_simple;
///
/// let frame = encode_simple(0x2101_0202, 0);
/// assert_eq!(frame, [0x02, 0x02, 0x01, 0x21, 0, 0, 0, 0, 0, 0, 0, 0]);
/// ```
pub fn encode_simple(code: u32, parameter: i32) -> [u8; SIMPLE_FRAME_SIZE] {
    let mut frame = [0u8; SIMPLE_FRAME_SIZE];
    frame[0..4].copy_from_slice(&code.to_le_bytes());
    frame[4..8].copy_from_slice(&(parameter as u32).to_le_bytes());
    // bytes 8..12 stay zero: reserved
    frame
}

/// Encodes an extended frame: header followed by `payload` verbatim.
///
/// The output is exactly `12 + payload.len()` bytes; no padding is added.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if `payload` is longer than
/// [`MAX_EXTENDED_PAYLOAD`](crate::protocol::messages::MAX_EXTENDED_PAYLOAD).
///
/// # Examples
///
/// ```rust
/// use quadlink_core::{decode_extended_header, encode_extended};
///
/// let frame = encode_extended(0x2101_0140, &[1, 2, 3]).unwrap();
/// assert_eq!(frame.len(), 15);
/// let header = decode_extended_header(&frame).unwrap();
/// assert_eq!(header.payload_length, 3);
/// ```
pub fn encode_extended(code: u32, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let staged = PayloadBuffer::from_slice(payload)?;
    Ok(encode_extended_staged(code, &staged))
}

/// Encodes an extended frame from a staging buffer.
///
/// Only the staged bytes go on the wire; unused capacity is never sent.
/// Infallible because a [`PayloadBuffer`] never holds more than
/// [`MAX_EXTENDED_PAYLOAD`](crate::protocol::messages::MAX_EXTENDED_PAYLOAD) bytes.
pub fn encode_extended_staged(code: u32, payload: &PayloadBuffer) -> Vec<u8> {
    let staged = payload.as_slice();
    let mut buf = Vec::with_capacity(EXTENDED_HEADER_SIZE + staged.len());
    buf.extend_from_slice(&EXTENDED_FRAME_KIND.to_le_bytes());
    buf.extend_from_slice(&code.to_le_bytes());
    buf.extend_from_slice(&(staged.len() as u32).to_le_bytes());
    buf.extend_from_slice(staged);
    buf
}

/// Encodes the extended axis command carrying `axis`.
///
/// The four words are staged in a [`PayloadBuffer`], so the frame is always
/// `12 + 16` bytes.
pub fn encode_axis(axis: &AxisVector) -> Vec<u8> {
    encode_extended_staged(opcode::AXIS_CONTROL, &PayloadBuffer::from(axis))
}

// ── Command decoding ──────────────────────────────────────────────────────────

/// Decodes a simple command. Bytes beyond the first 12 are ignored.
///
/// # Errors
///
/// Returns [`ProtocolError::TruncatedFrame`] below 12 bytes.
pub fn decode_simple(bytes: &[u8]) -> Result<SimpleCommand, ProtocolError> {
    require_frame(bytes, SIMPLE_FRAME_SIZE)?;
    Ok(SimpleCommand {
        code: read_u32(bytes, 0),
        parameter: read_u32(bytes, 4) as i32,
    })
}

/// Decodes the 12-byte header of an extended frame.
///
/// # Errors
///
/// Returns [`ProtocolError::TruncatedFrame`] below 12 bytes, or
/// [`ProtocolError::UnexpectedFrameKind`] if the marker word is not 1.
pub fn decode_extended_header(bytes: &[u8]) -> Result<ExtendedHeader, ProtocolError> {
    require_frame(bytes, EXTENDED_HEADER_SIZE)?;
    let kind = read_u32(bytes, 0);
    if kind != EXTENDED_FRAME_KIND {
        return Err(ProtocolError::UnexpectedFrameKind(kind));
    }
    Ok(ExtendedHeader {
        code: read_u32(bytes, 4),
        payload_length: read_u32(bytes, 8),
    })
}

/// Decodes a whole extended frame and returns its header and payload.
///
/// # Errors
///
/// Everything [`decode_extended_header`] returns, plus
/// [`ProtocolError::TruncatedPayload`] when fewer bytes follow the header
/// than it declares.
pub fn decode_extended(bytes: &[u8]) -> Result<(ExtendedHeader, &[u8]), ProtocolError> {
    let header = decode_extended_header(bytes)?;
    let declared = header.payload_length as usize;
    let body = &bytes[EXTENDED_HEADER_SIZE..];
    if body.len() < declared {
        return Err(ProtocolError::TruncatedPayload {
            kind: "extended",
            needed: declared,
            available: body.len(),
        });
    }
    Ok((header, &body[..declared]))
}

/// Decodes a 16-byte axis payload.
///
/// # Errors
///
/// Returns [`ProtocolError::TruncatedPayload`] below 16 bytes.
pub fn decode_axis_payload(payload: &[u8]) -> Result<AxisVector, ProtocolError> {
    require_payload(payload, AXIS_VECTOR_SIZE, "axis")?;
    Ok(AxisVector::new(
        read_u32(payload, 0),
        read_u32(payload, 4),
        read_u32(payload, 8),
        read_u32(payload, 12),
    ))
}

// ── Telemetry ─────────────────────────────────────────────────────────────────

/// Encodes a telemetry datagram whose header declares `payload.len()`.
pub fn encode_telemetry_packet(type_tag: u32, timestamp: u64, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(TELEMETRY_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&type_tag.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&timestamp.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Decodes the 16-byte telemetry header.
///
/// # Errors
///
/// Returns [`ProtocolError::TruncatedHeader`] below 16 bytes.
pub fn decode_telemetry_header(bytes: &[u8]) -> Result<TelemetryPacketHeader, ProtocolError> {
    if bytes.len() < TELEMETRY_HEADER_SIZE {
        return Err(ProtocolError::TruncatedHeader {
            needed: TELEMETRY_HEADER_SIZE,
            available: bytes.len(),
        });
    }
    Ok(TelemetryPacketHeader {
        type_tag: read_u32(bytes, 0),
        length: read_u32(bytes, 4),
        timestamp: read_u64(bytes, 8),
    })
}

/// Splits a telemetry datagram into its header and payload.
///
/// The payload is the bytes after the header, cut to the declared length
/// when the sender declared fewer bytes than it sent.  A declared length
/// larger than what arrived is not an error here; the typed decoders reject
/// payloads that are too short for their record.
///
/// # Errors
///
/// Returns [`ProtocolError::TruncatedHeader`] below 16 bytes.
pub fn decode_telemetry_packet(
    bytes: &[u8],
) -> Result<(TelemetryPacketHeader, &[u8]), ProtocolError> {
    let header = decode_telemetry_header(bytes)?;
    let available = &bytes[TELEMETRY_HEADER_SIZE..];
    let len = available.len().min(header.length as usize);
    Ok((header, &available[..len]))
}

/// Decodes a battery record from the first 16 payload bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::TruncatedPayload`] below 16 bytes.
pub fn decode_battery(payload: &[u8]) -> Result<BatteryTelemetry, ProtocolError> {
    require_payload(payload, BATTERY_RECORD_SIZE, "battery")?;
    Ok(BatteryTelemetry {
        voltage: read_f32(payload, 0),
        current: read_f32(payload, 4),
        percentage: read_f32(payload, 8),
        temperature: read_f32(payload, 12),
    })
}

/// Decodes an IMU record from the first 36 payload bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::TruncatedPayload`] below 36 bytes.
pub fn decode_imu(payload: &[u8]) -> Result<ImuTelemetry, ProtocolError> {
    require_payload(payload, IMU_RECORD_SIZE, "imu")?;
    Ok(ImuTelemetry {
        roll: read_f32(payload, 0),
        pitch: read_f32(payload, 4),
        yaw: read_f32(payload, 8),
        gyro_x: read_f32(payload, 12),
        gyro_y: read_f32(payload, 16),
        gyro_z: read_f32(payload, 20),
        acc_x: read_f32(payload, 24),
        acc_y: read_f32(payload, 28),
        acc_z: read_f32(payload, 32),
    })
}

/// Decodes as many whole joint records as the payload holds.
///
/// Never fails: a trailing partial record is ignored and a payload shorter
/// than one record yields an empty vector.
pub fn decode_joints(payload: &[u8]) -> Vec<JointTelemetry> {
    let remainder = payload.len() % JOINT_RECORD_SIZE;
    if remainder != 0 {
        trace!(remainder, "ignoring trailing partial joint record");
    }
    payload
        .chunks_exact(JOINT_RECORD_SIZE)
        .map(|record| JointTelemetry {
            position: read_f32(record, 0),
            velocity: read_f32(record, 4),
            torque: read_f32(record, 8),
            temperature: read_f32(record, 12),
        })
        .collect()
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn require_frame(buf: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::TruncatedFrame {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn require_payload(buf: &[u8], needed: usize, kind: &'static str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::TruncatedPayload {
            kind,
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

// Callers check the length first.
fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    (read_u32(buf, offset) as u64) | ((read_u32(buf, offset + 4) as u64) << 32)
}

fn read_f32(buf: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(buf, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::opcodes::opcode;
use crate::protocol::payload::PayloadBuffer;

    fn floats_to_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    // ── Simple ───────────────────────────────────────────────────────────────

    #[test]
    fn test_simple_round_trip_including_negative_parameters() {
        for (code, parameter) in [
            (opcode::HEARTBEAT, 0),
            (opcode::BODY_HEIGHT, 2),
            (opcode::LEGACY_LEFT_Y, -20000),
            (u32::MAX, i32::MIN),
            (0, i32::MAX),
        ] {
            let frame = encode_simple(code, parameter);
            let decoded = decode_simple(&frame).expect("decode failed");
            assert_eq!(decoded, SimpleCommand { code, parameter });
        }
    }

    #[test]
    fn test_simple_reserved_word_is_zero() {
        let frame = encode_simple(0xFFFF_FFFF, -1);
        assert_eq!(&frame[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_simple_rejects_short_frame() {
        assert_eq!(
            decode_simple(&[0u8; 11]),
            Err(ProtocolError::TruncatedFrame {
                needed: 12,
                available: 11
            })
        );
    }

    // ── Extended ─────────────────────────────────────────────────────────────

    #[test]
    fn test_extended_length_is_header_plus_payload() {
        for len in [0usize, 1, 16, 63, 64] {
            // Arrange
            let payload = vec![0x5A; len];

            // Act
            let frame = encode_extended(0x1234_5678, &payload).expect("encode failed");
            let header = decode_extended_header(&frame).expect("decode failed");

            // Assert
            assert_eq!(frame.len(), EXTENDED_HEADER_SIZE + len);
            assert_eq!(header.code, 0x1234_5678);
            assert_eq!(header.payload_length as usize, len);
            assert_eq!(&frame[EXTENDED_HEADER_SIZE..], payload.as_slice());
        }
    }

    #[test]
    fn test_extended_rejects_oversized_payload() {
        assert_eq!(
            encode_extended(opcode::AXIS_CONTROL, &[0u8; 65]),
            Err(ProtocolError::PayloadTooLarge { len: 65, max: 64 })
        );
    }

    #[test]
    fn test_extended_header_rejects_wrong_kind() {
        // Arrange – a simple frame is not an extended frame
        let frame = encode_simple(opcode::STAND_UP, 0);

        // Act
        let result = decode_extended_header(&frame);

        // Assert
        assert_eq!(result, Err(ProtocolError::UnexpectedFrameKind(opcode::STAND_UP)));
    }

    #[test]
    fn test_decode_extended_rejects_missing_payload_bytes() {
        // Arrange
        let mut frame = encode_extended(7, &[1, 2, 3, 4]).unwrap();
        frame.truncate(14);

        // Act
        let result = decode_extended(&frame);

        // Assert
        assert_eq!(
            result,
            Err(ProtocolError::TruncatedPayload {
                kind: "extended",
                needed: 4,
                available: 2
            })
        );
    }

    #[test]
    fn test_axis_frame_layout() {
        // Arrange
        let axis = AxisVector::new(500, 0, 0, 0);

        // Act
        let frame = encode_axis(&axis);

        // Assert
        assert_eq!(frame.len(), 28);
        assert_eq!(&frame[0..4], &1u32.to_le_bytes());
        assert_eq!(&frame[4..8], &0x2101_0140u32.to_le_bytes());
        assert_eq!(&frame[8..12], &16u32.to_le_bytes());
        assert_eq!(&frame[12..16], &500u32.to_le_bytes());
        assert_eq!(&frame[16..28], &[0u8; 12]);
    }

    #[test]
    fn test_axis_frame_matches_generic_extended_encoding() {
        let axis = AxisVector::from_signed(-1000, 250, 0, 1);
        let payload: Vec<u8> = axis.to_words().iter().flat_map(|w| w.to_le_bytes()).collect();

        let generic = encode_extended(opcode::AXIS_CONTROL, &payload).unwrap();

        assert_eq!(encode_axis(&axis).as_slice(), generic.as_slice());
    }

    #[test]
    fn test_staged_encoding_sends_used_bytes_not_capacity() {
        // Arrange
        let mut staged = PayloadBuffer::new();
        staged.push_u32(500).unwrap();

        // Act
        let frame = encode_extended_staged(0x2101_0140, &staged);

        // Assert
        assert_eq!(frame.len(), EXTENDED_HEADER_SIZE + 4);
        assert_eq!(decode_extended_header(&frame).unwrap().payload_length, 4);
        assert_eq!(&frame[EXTENDED_HEADER_SIZE..], &500u32.to_le_bytes());
    }

    #[test]
    fn test_axis_frame_decodes_back() {
        let axis = AxisVector::from_signed(1, -2, 3, -4);
        let frame = encode_axis(&axis);

        let (header, payload) = decode_extended(&frame).unwrap();

        assert_eq!(header.code, opcode::AXIS_CONTROL);
        assert_eq!(decode_axis_payload(payload), Ok(axis));
    }

    // ── Telemetry ────────────────────────────────────────────────────────────

    #[test]
    fn test_telemetry_header_rejects_fifteen_bytes() {
        assert_eq!(
            decode_telemetry_header(&[0u8; 15]),
            Err(ProtocolError::TruncatedHeader {
                needed: 16,
                available: 15
            })
        );
    }

    #[test]
    fn test_telemetry_header_fields() {
        // Arrange
        let packet = encode_telemetry_packet(0x03, 0x0102_0304_0506_0708, &[0u8; 32]);

        // Act
        let header = decode_telemetry_header(&packet).unwrap();

        // Assert
        assert_eq!(header.type_tag, 0x03);
        assert_eq!(header.length, 32);
        assert_eq!(header.timestamp, 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_packet_payload_is_cut_to_declared_length() {
        // Arrange – header declares 4 bytes but 8 follow
        let mut packet = encode_telemetry_packet(0x01, 0, &[1, 2, 3, 4]);
        packet.extend_from_slice(&[9, 9, 9, 9]);

        // Act
        let (_, payload) = decode_telemetry_packet(&packet).unwrap();

        // Assert
        assert_eq!(payload, &[1, 2, 3, 4]);
    }

    #[test]
    fn test_packet_payload_is_cut_to_available_bytes() {
        // Arrange – header declares 100 bytes but only 3 arrive
        let mut packet = encode_telemetry_packet(0x01, 0, &[1, 2, 3]);
        packet[4..8].copy_from_slice(&100u32.to_le_bytes());

        // Act
        let (header, payload) = decode_telemetry_packet(&packet).unwrap();

        // Assert
        assert_eq!(header.length, 100);
        assert_eq!(payload, &[1, 2, 3]);
    }

    #[test]
    fn test_battery_decodes_fields_in_order() {
        // Arrange
        let payload = floats_to_bytes(&[25.2, -1.5, 87.0, 31.25]);

        // Act
        let battery = decode_battery(&payload).unwrap();

        // Assert
        assert_eq!(
            battery,
            BatteryTelemetry {
                voltage: 25.2,
                current: -1.5,
                percentage: 87.0,
                temperature: 31.25,
            }
        );
    }

    #[test]
    fn test_battery_fifteen_bytes_is_truncated() {
        assert_eq!(
            decode_battery(&[0u8; 15]),
            Err(ProtocolError::TruncatedPayload {
                kind: "battery",
                needed: 16,
                available: 15
            })
        );
    }

    #[test]
    fn test_imu_decodes_all_nine_fields() {
        // Arrange
        let values = [0.1, 0.2, 0.3, 1.0, 2.0, 3.0, -9.8, 0.0, 9.81];
        let payload = floats_to_bytes(&values);

        // Act
        let imu = decode_imu(&payload).unwrap();

        // Assert
        assert_eq!(imu.roll, 0.1);
        assert_eq!(imu.yaw, 0.3);
        assert_eq!(imu.gyro_z, 3.0);
        assert_eq!(imu.acc_x, -9.8);
        assert_eq!(imu.acc_z, 9.81);
    }

    #[test]
    fn test_imu_short_payload_is_truncated() {
        assert!(matches!(
            decode_imu(&[0u8; 35]),
            Err(ProtocolError::TruncatedPayload { kind: "imu", needed: 36, available: 35 })
        ));
    }

    #[test]
    fn test_joints_ignore_trailing_partial_record() {
        // Arrange – two whole records and 7 stray bytes
        let mut payload = floats_to_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        payload.extend_from_slice(&[0xFF; 7]);

        // Act
        let joints = decode_joints(&payload);

        // Assert
        assert_eq!(joints.len(), 2);
        assert_eq!(joints[1].position, 5.0);
        assert_eq!(joints[1].temperature, 8.0);
    }

    #[test]
    fn test_joints_short_payload_is_empty() {
        assert!(decode_joints(&[0u8; 15]).is_empty());
        assert!(decode_joints(&[]).is_empty());
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let err = ProtocolError::TruncatedPayload {
            kind: "battery",
            needed: 16,
            available: 15,
        };
        assert_eq!(
            err.to_string(),
            "truncated battery payload: need 16 bytes, got 15"
        );
    }
}
