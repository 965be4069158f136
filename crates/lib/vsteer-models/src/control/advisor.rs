use log::{debug, info};

use vsteer_core::agent::AgentId;
use vsteer_core::radio::{DatagramSocket, TransportError};

use crate::partition::GroupSummary;

/// Bytes in one summary row: four `f32` values.
pub const SUMMARY_ROW_SIZE: usize = 16;

/// Rows of `[centroid x, centroid y, centroid speed, representative id]` as little-endian
/// `f32`, one row per group in group order.
pub fn encode_summaries(summaries: &[GroupSummary]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(summaries.len() * SUMMARY_ROW_SIZE);
    for summary in summaries {
        for value in [
            summary.centroid_x,
            summary.centroid_y,
            summary.centroid_speed,
            summary.representative_id,
        ] {
            bytes.extend_from_slice(&(value as f32).to_le_bytes());
        }
    }
    bytes
}

/// Reads back rows written by [`encode_summaries`]. Trailing bytes that do not fill a whole
/// row are ignored.
pub fn decode_summaries(bytes: &[u8]) -> Vec<[f32; 4]> {
    bytes
        .chunks_exact(SUMMARY_ROW_SIZE)
        .map(|row| {
            let mut values = [0f32; 4];
            for (value, raw) in values.iter_mut().zip(row.chunks_exact(4)) {
                *value = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            }
            values
        })
        .collect()
}

/// Pushes the group summaries of a clustering run to the control plane in one datagram.
#[derive(Debug)]
pub struct FlowAdvisor<S: DatagramSocket> {
    socket: S,
    control_plane: AgentId,
}

impl<S: DatagramSocket> FlowAdvisor<S> {
    pub fn new(socket: S, control_plane: AgentId) -> Self {
        Self {
            socket,
            control_plane,
        }
    }

    pub fn control_plane(&self) -> AgentId {
        self.control_plane
    }

    /// Connects to the control plane and sends the summaries. There is no retry; a failed
    /// connect or send is returned to the caller.
    pub fn advise(&mut self, summaries: &[GroupSummary]) -> Result<usize, TransportError> {
        self.socket.connect(self.control_plane)?;
        let payload = encode_summaries(summaries);
        let sent = self.socket.send(&payload)?;
        info!(
            "Sent {} group summaries ({} bytes) to control plane {}",
            summaries.len(),
            sent,
            self.control_plane
        );
        debug!("Summary payload: {:?}", decode_summaries(&payload));
        Ok(sent)
    }
}
