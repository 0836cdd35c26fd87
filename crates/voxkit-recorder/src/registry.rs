//! Slot-arena callback channels for lifecycle events.
//!
//! Each lifecycle event owns one channel. Registration hands back an RAII
//! guard; dropping the guard deregisters in O(1) via the slot index. Dispatch
//! iterates a snapshot of the live callbacks, so callbacks registered or
//! dropped mid-dispatch take effect from the next dispatch on.

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;

/// An awaitable callback taking the event payload.
pub type AsyncCallback<A> = Arc<dyn Fn(A) -> BoxFuture<'static, ()> + Send + Sync>;

struct Slots<A> {
    entries: Vec<Option<AsyncCallback<A>>>,
    free: Vec<usize>,
}

impl<A> Default for Slots<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
        }
    }
}

/// One named lifecycle channel.
pub struct CallbackChannel<A> {
    slots: Arc<Mutex<Slots<A>>>,
}

impl<A> Default for CallbackChannel<A> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots::default())),
        }
    }
}

impl<A: Clone + Send + 'static> CallbackChannel<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it stays live until the returned guard drops.
    pub fn register(&self, callback: AsyncCallback<A>) -> CallbackGuard {
        let slot = {
            let mut slots = self.slots.lock();
            match slots.free.pop() {
                Some(slot) => {
                    slots.entries[slot] = Some(callback);
                    slot
                }
                None => {
                    slots.entries.push(Some(callback));
                    slots.entries.len() - 1
                }
            }
        };
        let slots = Arc::downgrade(&self.slots);
        CallbackGuard {
            deregister: Some(Box::new(move || {
                if let Some(slots) = slots.upgrade() {
                    let mut slots = slots.lock();
                    slots.entries[slot] = None;
                    slots.free.push(slot);
                }
            })),
        }
    }

    /// Invoke every live callback sequentially in registration order,
    /// awaiting each before the next starts.
    pub async fn dispatch(&self, args: A) {
        let snapshot: Vec<AsyncCallback<A>> = {
            let slots = self.slots.lock();
            slots.entries.iter().flatten().cloned().collect()
        };
        for callback in snapshot {
            callback(args.clone()).await;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deregistration token for one callback registration.
///
/// Subscriptions are a relation, not ownership: dropping the guard severs the
/// link deterministically, which is how plugins shed their recorder
/// subscriptions on deactivate.
pub struct CallbackGuard {
    deregister: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Drop for CallbackGuard {
    fn drop(&mut self) {
        if let Some(deregister) = self.deregister.take() {
            deregister();
        }
    }
}

impl std::fmt::Debug for CallbackGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackGuard").finish_non_exhaustive()
    }
}
