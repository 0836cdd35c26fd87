pub mod feedback;

pub use feedback::{ErrorFeedbackPlugin, FeedbackEffects};
