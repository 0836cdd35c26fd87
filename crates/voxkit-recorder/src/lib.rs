//! Recorder lifecycle core for VoxKit.
//!
//! Turns a microphone button press into a correctly ordered sequence of
//! lifecycle events (`idle → loading → recording → processing → idle`),
//! fanning audio frames and transitions out to an ordered set of plugins.
//! Transitions are serialized on one mutex; the delayed start/stop tails are
//! cancellable tasks whose cancellation is never surfaced as an error.

pub mod core;
pub mod model;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod state;

pub use crate::core::RecorderCore;
pub use model::RecorderModel;
pub use plugin::RecorderPlugin;
pub use registry::{AsyncCallback, CallbackChannel, CallbackGuard};
pub use state::RecorderState;
