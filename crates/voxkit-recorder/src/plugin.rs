use std::sync::Arc;

use async_trait::async_trait;

use crate::model::RecorderModel;

/// An extension that adds behavior to the recorder without modifying it.
///
/// Plugins subscribe to lifecycle events and audio frames during `activate`
/// and must drop those subscriptions in `deactivate` (holding registration
/// guards and releasing them is enough). The core owns the plugin list and
/// serializes activation, deactivation, and lifecycle transitions on one
/// mutex, so implementations never observe themselves activating twice
/// concurrently.
#[async_trait]
pub trait RecorderPlugin: Send + Sync {
    /// Stable identifier used in logs.
    fn name(&self) -> &str;

    async fn activate(&self, model: &Arc<RecorderModel>);

    async fn deactivate(&self, _model: &Arc<RecorderModel>) {}
}
