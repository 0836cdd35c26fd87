//! Audio model and capture capability for the VoxKit core.
//!
//! Defines the PCM frame value type, the single supported recording
//! configuration, and the `AudioSource` trait the platform layer implements.
//! The core consumes these; it never touches the OS audio session itself.

pub mod config;
pub mod frame;
pub mod mock;
pub mod source;

pub use config::{RecordingConfig, SampleEncoding, SAMPLE_RATE_HZ};
pub use frame::AudioFrame;
pub use mock::MockAudioSource;
pub use source::{AudioFrameSink, AudioSource};
