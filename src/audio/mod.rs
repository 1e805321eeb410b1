//! Audio capture: device catalog, the PCM block type, and the capture
//! session that feeds blocks to the recording session.

pub mod capture;
pub mod devices;

/// Sample rate the whole pipeline runs at. The backend expects raw
/// little-endian f32 mono at this rate, agreed out of band.
pub const SAMPLE_RATE: u32 = 16_000;

/// Samples per block handed from the capture thread to the session.
/// One processing quantum (8 ms at 16 kHz).
pub const BLOCK_SAMPLES: usize = 128;

/// One quantum of 16 kHz mono f32 samples, freshly owned.
///
/// Produced on the capture thread, moved through the block channel, and
/// consumed once when the transport turns it into a binary frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBlock {
    samples: Vec<f32>,
}

impl PcmBlock {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Wire bytes: each sample as little-endian f32, no header.
    pub fn into_le_bytes(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.samples.len() * 4);
        for sample in self.samples {
            buf.extend_from_slice(&sample.to_le_bytes());
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_bytes_are_little_endian_f32() {
        let block = PcmBlock::new(vec![0.0, 1.0, -0.5]);
        let bytes = block.into_le_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &0.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[8..12], &(-0.5f32).to_le_bytes());
    }
}
