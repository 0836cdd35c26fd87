use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};

use voxkit_audio::AudioFrame;
use voxkit_foundation::SessionError;

/// Synchronous (one-shot) transcription collaborator.
///
/// Takes a complete base64-encoded capture and returns the transcript in one
/// round trip. Buffer limits and retry policy are the implementation's
/// business; the HTTP client behind it lives at the application boundary.
#[async_trait]
pub trait TranscribeService: Send + Sync {
    async fn transcribe(&self, base64_audio: &str) -> Result<String, SessionError>;
}

/// Encode captured frames as the base64 payload `TranscribeService` expects:
/// contiguous little-endian s16 PCM, frames in capture order.
pub fn encode_audio_base64(frames: &[AudioFrame]) -> String {
    let mut bytes = Vec::with_capacity(frames.iter().map(|f| f.len() * 2).sum());
    for frame in frames {
        bytes.extend_from_slice(&frame.to_le_bytes());
    }
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_concatenated_le_samples() {
        let frames = [
            AudioFrame::new(vec![0x0102], 16_000),
            AudioFrame::new(vec![-2], 16_000),
        ];
        // [0x02, 0x01, 0xFE, 0xFF]
        assert_eq!(encode_audio_base64(&frames), "AgH+/w==");
    }

    #[test]
    fn empty_capture_encodes_to_empty_string() {
        assert_eq!(encode_audio_base64(&[]), "");
    }
}
