//! Shared foundation for the VoxKit speech-capture core.
//!
//! Owns the error taxonomy used across the workspace so that every crate
//! folds its failures into one `VoxKitError` union before they reach the
//! recorder's error channel.

pub mod error;

pub use error::*;
