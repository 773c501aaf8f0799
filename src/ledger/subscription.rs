//! Change notification for ledger observers.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    mpsc::Sender,
    Arc, Mutex, MutexGuard, Weak,
};

use super::snapshot::LedgerSnapshot;

type Callback = Arc<dyn Fn(&Arc<LedgerSnapshot>) + Send + Sync>;

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Callback)>>,
}

impl SubscriberRegistry {
    pub(crate) fn register(self: &Arc<Self>, callback: Callback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, callback));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    pub(crate) fn register_channel(
        self: &Arc<Self>,
        sender: Sender<Arc<LedgerSnapshot>>,
    ) -> Subscription {
        let sender = Mutex::new(sender);
        self.register(Arc::new(move |snapshot: &Arc<LedgerSnapshot>| {
            let sender = sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // A closed receiver just means nobody is listening anymore.
            let _ = sender.send(Arc::clone(snapshot));
        }))
    }

    /// Calls every live subscriber with `snapshot`. The callbacks run outside the registry lock.
    pub(crate) fn notify(&self, snapshot: &Arc<LedgerSnapshot>) {
        let callbacks: Vec<Callback> = self
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(snapshot);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|(entry_id, _)| *entry_id != id);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(u64, Callback)>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps a subscriber registered. Dropping it stops delivery.
#[must_use = "dropping a subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{atomic::AtomicUsize, mpsc};

    #[test]
    fn dropping_subscription_stops_delivery() {
        let registry = Arc::new(SubscriberRegistry::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = registry.register(Arc::new(move |_: &Arc<LedgerSnapshot>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let snapshot = Arc::new(LedgerSnapshot::empty());
        registry.notify(&snapshot);
        drop(subscription);
        registry.notify(&snapshot);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn channel_subscriber_receives_shared_snapshot() {
        let registry = Arc::new(SubscriberRegistry::default());
        let (tx, rx) = mpsc::channel();
        let _subscription = registry.register_channel(tx);

        let snapshot = Arc::new(LedgerSnapshot::empty());
        registry.notify(&snapshot);

        let received = rx.try_recv().expect("snapshot delivered");
        assert!(Arc::ptr_eq(&received, &snapshot));
    }
}
