//! Observable value container
//!
//! Values change only by whole replacement. Subscribers get the current value
//! as soon as they subscribe and every replacement after that. Replacements
//! may carry a version; a versioned replacement older than the last applied
//! one is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

/// One subscriber. `delivered` is the sequence number of the last write it
/// was handed; it is held while the callback runs so deliveries to the same
/// subscriber never overlap and a write older than one already delivered is
/// skipped. A callback must not write to the observable it listens to.
struct Subscriber<T> {
    id: u64,
    callback: Callback<T>,
    delivered: Mutex<Option<u64>>,
    active: Arc<AtomicBool>,
}

impl<T> Subscriber<T> {
    fn deliver(&self, seq: u64, value: &T) {
        let mut delivered = self.delivered.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.active.load(Ordering::SeqCst) || delivered.is_some_and(|last| seq <= last) {
            return;
        }
        *delivered = Some(seq);
        (self.callback)(value);
    }
}

struct Inner<T> {
    value: T,
    version: u64,
    /// Bumped on every applied write, versioned or not
    seq: u64,
    next_subscriber: u64,
    subscribers: Vec<Arc<Subscriber<T>>>,
}

pub struct Observable<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default + Clone + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value,
                version: 0,
                seq: 0,
                next_subscriber: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // A panicking subscriber must not wedge the store
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let (subscriber, seq, current) = {
            let mut inner = self.lock();
            let subscriber = Arc::new(Subscriber {
                id: inner.next_subscriber,
                callback: Box::new(callback),
                delivered: Mutex::new(None),
                active: Arc::clone(&active),
            });
            inner.next_subscriber += 1;
            inner.subscribers.push(Arc::clone(&subscriber));
            (subscriber, inner.seq, inner.value.clone())
        };

        subscriber.deliver(seq, &current);

        let id = subscriber.id;
        let weak: Weak<Mutex<Inner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            detach: Box::new(move || {
                active.store(false, Ordering::SeqCst);
                if let Some(inner) = weak.upgrade() {
                    let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    inner.subscribers.retain(|s| s.id != id);
                }
            }),
        }
    }

    /// Point-in-time read through a transient subscription
    pub fn snapshot(&self) -> T {
        let slot: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
        let writer = Arc::clone(&slot);
        let subscription = self.subscribe(move |value: &T| {
            let mut slot = writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if slot.is_none() {
                *slot = Some(value.clone());
            }
        });
        subscription.unsubscribe();

        let taken = slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        taken.unwrap_or_else(|| self.lock().value.clone())
    }

    /// Replace unconditionally, keeping the current version
    pub fn set(&self, value: T) {
        self.apply(None, value);
    }

    /// Replace if `version` is not older than the last applied version.
    /// Returns whether the value was applied.
    pub fn replace(&self, version: u64, value: T) -> bool {
        self.apply(Some(version), value)
    }

    fn apply(&self, version: Option<u64>, value: T) -> bool {
        let (seq, subscribers) = {
            let mut inner = self.lock();
            if let Some(version) = version {
                if version < inner.version {
                    return false;
                }
                inner.version = version;
            }
            inner.seq += 1;
            inner.value = value.clone();
            (inner.seq, inner.subscribers.clone())
        };

        for subscriber in subscribers {
            subscriber.deliver(seq, &value);
        }
        true
    }

    pub fn version(&self) -> u64 {
        self.lock().version
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// Handle returned by [`Observable::subscribe`]
pub struct Subscription {
    detach: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    /// Stop delivery. Calling this more than once is harmless.
    pub fn unsubscribe(&self) {
        (self.detach)();
    }
}
