use std::time::Instant;

/// One captured chunk of signed 16-bit mono PCM.
///
/// Frames are value types: once emitted by the audio source they are never
/// mutated, only cloned into the fan-out paths that need them.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub timestamp: Instant,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            timestamp: Instant::now(),
        }
    }

    /// Root-mean-square volume of the frame: `sqrt(mean(sample²))`.
    ///
    /// Returns `0.0` for an empty frame.
    pub fn rms_volume(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self
            .samples
            .iter()
            .map(|&s| {
                let v = s as f64;
                v * v
            })
            .sum();
        (sum_sq / self.samples.len() as f64).sqrt() as f32
    }

    /// Contiguous little-endian byte view of the samples, as sent on the
    /// streaming transport.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 2);
        for s in &self.samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_empty_frame_is_zero() {
        let frame = AudioFrame::new(vec![], 16_000);
        assert_eq!(frame.rms_volume(), 0.0);
    }

    #[test]
    fn rms_of_constant_signal() {
        let frame = AudioFrame::new(vec![100; 512], 16_000);
        assert!((frame.rms_volume() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn rms_of_alternating_signal() {
        // RMS ignores sign.
        let frame = AudioFrame::new(vec![200, -200, 200, -200], 16_000);
        assert!((frame.rms_volume() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn le_byte_layout() {
        let frame = AudioFrame::new(vec![0x0102, -2], 16_000);
        assert_eq!(frame.to_le_bytes(), vec![0x02, 0x01, 0xFE, 0xFF]);
    }
}
