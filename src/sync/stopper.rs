//! Stop broadcast.
//!
//! Any holder of an [`IrrigationStopper`] can request a stop; every
//! subscriber callback is invoked synchronously, in registration order,
//! on the caller's thread.  Callbacks run outside the registry lock, so a
//! callback may subscribe or unsubscribe without deadlocking.

use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::info;

/// Callback invoked on every stop request.
pub type StopCallback = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`IrrigationStopper::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, StopCallback)>,
}

/// Shared stop-request channel.  Clones share subscribers.
#[derive(Clone)]
pub struct IrrigationStopper {
    registry: Arc<Mutex<CriticalSectionRawMutex, RefCell<Registry>>>,
}

impl IrrigationStopper {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(RefCell::new(Registry::default()))),
        }
    }

    /// Register `callback` for every future stop request.
    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let callback: StopCallback = Arc::new(callback);
        self.registry.lock(|r| {
            let mut r = r.borrow_mut();
            let id = SubscriptionId(r.next_id);
            r.next_id += 1;
            r.subscribers.push((id, callback));
            id
        })
    }

    /// Remove a subscriber.  Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.lock(|r| {
            let mut r = r.borrow_mut();
            let before = r.subscribers.len();
            r.subscribers.retain(|(sid, _)| *sid != id);
            r.subscribers.len() != before
        })
    }

    /// Notify every current subscriber.  With none registered this is a no-op.
    pub fn request_stop(&self) {
        let callbacks: Vec<StopCallback> = self.registry.lock(|r| {
            r.borrow()
                .subscribers
                .iter()
                .map(|(_, cb)| cb.clone())
                .collect()
        });
        info!("Stop requested ({} subscribers)", callbacks.len());
        for callback in callbacks {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock(|r| r.borrow().subscribers.len())
    }
}

impl Default for IrrigationStopper {
    fn default() -> Self {
        Self::new()
    }
}
