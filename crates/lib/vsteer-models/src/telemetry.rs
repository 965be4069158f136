use std::fmt::{Display, Formatter};

use thiserror::Error;
use typed_builder::TypedBuilder;

use vsteer_core::agent::AgentId;

/// Size of one encoded record: three `f64` fields followed by the `u32` agent ID.
pub const TELEMETRY_SIZE: usize = 28;

/// Kinematic state reported by one vehicle at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, TypedBuilder)]
pub struct TelemetryRecord {
    pub position_x: f64,
    pub position_y: f64,
    pub speed: f64,
    pub agent_id: AgentId,
}

impl Display for TelemetryRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(agent: {}, x: {}, y: {}, speed: {})",
            self.agent_id, self.position_x, self.position_y, self.speed
        )
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("telemetry datagram has {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

impl TelemetryRecord {
    pub fn encode(&self) -> [u8; TELEMETRY_SIZE] {
        let mut buffer = [0u8; TELEMETRY_SIZE];
        buffer[0..8].copy_from_slice(&self.position_x.to_le_bytes());
        buffer[8..16].copy_from_slice(&self.position_y.to_le_bytes());
        buffer[16..24].copy_from_slice(&self.speed.to_le_bytes());
        buffer[24..28].copy_from_slice(&self.agent_id.as_u32().to_le_bytes());
        buffer
    }

    /// Decodes exactly one record. Anything but a full record is rejected, trailing bytes
    /// included.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let bytes: &[u8; TELEMETRY_SIZE] =
            bytes.try_into().map_err(|_| DecodeError::SizeMismatch {
                expected: TELEMETRY_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self {
            position_x: f64::from_le_bytes(field(bytes, 0)),
            position_y: f64::from_le_bytes(field(bytes, 8)),
            speed: f64::from_le_bytes(field(bytes, 16)),
            agent_id: AgentId::from(u32::from_le_bytes(field(bytes, 24))),
        })
    }

    /// The point used by the partitioner: position, speed and the reporting agent's ID.
    pub fn features(&self) -> [f64; 4] {
        [
            self.position_x,
            self.position_y,
            self.speed,
            self.agent_id.as_f64(),
        ]
    }
}

#[inline]
fn field<const N: usize>(bytes: &[u8; TELEMETRY_SIZE], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TelemetryRecord {
        TelemetryRecord::builder()
            .position_x(120.5)
            .position_y(-0.25)
            .speed(20.0)
            .agent_id(AgentId::from(17))
            .build()
    }

    #[test]
    fn encoded_size_matches_wire_contract() {
        assert_eq!(record().encode().len(), TELEMETRY_SIZE);
    }

    #[test]
    fn decode_restores_the_record() {
        let decoded = TelemetryRecord::decode(&record().encode()).expect("valid record");
        assert_eq!(decoded, record());
    }

    #[test]
    fn special_floats_survive_the_byte_layout() {
        let original = TelemetryRecord::builder()
            .position_x(f64::MAX)
            .position_y(-0.0)
            .speed(f64::MIN_POSITIVE)
            .agent_id(AgentId::from(u32::MAX))
            .build();
        let decoded = TelemetryRecord::decode(&original.encode()).expect("valid record");
        assert_eq!(decoded.position_x.to_bits(), original.position_x.to_bits());
        assert_eq!(decoded.position_y.to_bits(), original.position_y.to_bits());
        assert_eq!(decoded.speed.to_bits(), original.speed.to_bits());
        assert_eq!(decoded.agent_id, original.agent_id);
    }

    #[test]
    fn short_and_long_datagrams_are_rejected() {
        assert_eq!(
            TelemetryRecord::decode(&[0u8; 10]),
            Err(DecodeError::SizeMismatch {
                expected: TELEMETRY_SIZE,
                actual: 10
            })
        );
        assert!(TelemetryRecord::decode(&[0u8; 32]).is_err());
        assert!(TelemetryRecord::decode(&[]).is_err());
    }
}
