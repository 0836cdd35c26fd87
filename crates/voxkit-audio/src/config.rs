use serde::{Deserialize, Serialize};
use voxkit_foundation::AudioSourceError;

/// Sample encoding of captured audio.
///
/// Only signed 16-bit PCM is in scope; the enum exists so the config is
/// explicit on the wire and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    PcmS16,
}

/// Capture configuration handed to the audio source.
///
/// The core supports exactly one combination: 16 kHz, mono, signed 16-bit
/// PCM, non-interleaved. `validate` rejects everything else so a
/// misconfigured embedder fails at start rather than producing garbage
/// frames downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
    pub interleaved: bool,
}

pub const SAMPLE_RATE_HZ: u32 = 16_000;

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE_HZ,
            channels: 1,
            encoding: SampleEncoding::PcmS16,
            interleaved: false,
        }
    }
}

impl RecordingConfig {
    pub fn validate(&self) -> Result<(), AudioSourceError> {
        if self.sample_rate != SAMPLE_RATE_HZ {
            return Err(AudioSourceError::UnsupportedAudioFormat(format!(
                "sample rate {} Hz not supported, expected {}",
                self.sample_rate, SAMPLE_RATE_HZ
            )));
        }
        if self.channels != 1 {
            return Err(AudioSourceError::UnsupportedAudioFormat(format!(
                "{} channels not supported, expected mono",
                self.channels
            )));
        }
        if self.interleaved {
            return Err(AudioSourceError::UnsupportedAudioFormat(
                "interleaved layout not supported".into(),
            ));
        }
        Ok(())
    }
}
