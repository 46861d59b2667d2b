//! Named-event publish/subscribe bus.
//!
//! Every state node owns one [`Emitter`] and fires `"change"` on it; pending
//! values fire `"done"` on theirs. Listeners for one event run synchronously,
//! in the order they subscribed.

use crate::hash::FastHashBuilder;
use indexmap::IndexMap;
use papaya::HashMap as PapayaHashMap;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Shared listener callback.
pub type Listener<P> = Arc<dyn Fn(&P) + Send + Sync>;

type ListenerSet<P> = RwLock<IndexMap<u64, Listener<P>, FastHashBuilder>>;

struct EmitterInner<P> {
    /// Event name -> listeners in subscription order.
    events: PapayaHashMap<Cow<'static, str>, ListenerSet<P>, FastHashBuilder>,
    next_listener: AtomicU64,
}

impl<P> EmitterInner<P> {
    fn remove(&self, event: &str, listener: u64) {
        let guard = self.events.pin();
        if let Some(set) = guard.get(event) {
            set.write().shift_remove(&listener);
        }
    }
}

/// Minimal named-event emitter.
///
/// Cloning an `Emitter` yields another handle to the same listener table.
pub struct Emitter<P = ()> {
    inner: Arc<EmitterInner<P>>,
}

impl<P> Clone for Emitter<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: 'static> Default for Emitter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for Emitter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("events", &self.inner.events.len())
            .finish()
    }
}

impl<P: 'static> Emitter<P> {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                events: PapayaHashMap::with_hasher(FastHashBuilder),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    /// Register `listener` for `event`.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or explicitly unsubscribed.
    pub fn on<F>(&self, event: impl Into<Cow<'static, str>>, listener: F) -> Subscription
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.on_shared(event, Arc::new(listener))
    }

    pub(crate) fn on_shared(
        &self,
        event: impl Into<Cow<'static, str>>,
        listener: Listener<P>,
    ) -> Subscription {
        let event = event.into();
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        {
            let guard = self.inner.events.pin();
            guard
                .get_or_insert_with(event.clone(), || {
                    RwLock::new(IndexMap::with_hasher(FastHashBuilder))
                })
                .write()
                .insert(id, listener);
        }

        let weak: Weak<EmitterInner<P>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(&event, id);
            }
        })
    }

    /// Call every listener of `event` with `params`.
    ///
    /// The listener list is snapshotted first, so listeners may subscribe or
    /// unsubscribe (including themselves) while being notified.
    pub fn emit(&self, event: &str, params: &P) {
        let listeners: Vec<Listener<P>> = {
            let guard = self.inner.events.pin();
            match guard.get(event) {
                Some(set) => set.read().values().cloned().collect(),
                None => return,
            }
        };
        for listener in listeners {
            listener(params);
        }
    }

    /// Emit several events in order with the same `params`.
    pub fn emit_all(&self, events: &[&str], params: &P) {
        for event in events {
            self.emit(event, params);
        }
    }

    /// Drop every listener of every event.
    ///
    /// Subscriptions handed out before the clear become no-ops.
    pub fn clear(&self) {
        self.inner.events.pin().clear();
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        let guard = self.inner.events.pin();
        guard.get(event).map(|set| set.read().len()).unwrap_or(0)
    }

    /// A [`Subscribable`] view of one event of this emitter.
    pub fn event(&self, event: impl Into<Cow<'static, str>>) -> EventSource<P> {
        EventSource {
            emitter: self.clone(),
            event: event.into(),
        }
    }

    /// Identity of the listener table, stable while any handle is alive.
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

/// Handle returned by every subscribe operation.
///
/// Dropping it unsubscribes; call [`detach`](Subscription::detach) to keep the
/// listener registered for the lifetime of its source instead.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    /// Keep the listener registered and forget the handle.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// Anything a listener can be attached to.
///
/// Implemented by state handles, loadables and [`EventSource`]; this is what
/// `State::watch` accepts.
pub trait Subscribable<P = ()> {
    /// Attach `listener`; it runs every time the source fires.
    fn subscribe_listener(&self, listener: Listener<P>) -> Subscription;
}

/// One named event of an [`Emitter`].
pub struct EventSource<P = ()> {
    emitter: Emitter<P>,
    event: Cow<'static, str>,
}

impl<P: 'static> Subscribable<P> for EventSource<P> {
    fn subscribe_listener(&self, listener: Listener<P>) -> Subscription {
        self.emitter.on_shared(self.event.clone(), listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn listeners_run_in_subscription_order() {
        let emitter: Emitter<u32> = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let log = log.clone();
            emitter.on("change", move |v: &u32| log.lock().push(("first", *v)))
        };
        let second = {
            let log = log.clone();
            emitter.on("change", move |v: &u32| log.lock().push(("second", *v)))
        };

        emitter.emit("change", &7);
        assert_eq!(*log.lock(), vec![("first", 7), ("second", 7)]);

        drop(first);
        emitter.emit("change", &8);
        assert_eq!(log.lock().last(), Some(&("second", 8)));
        assert_eq!(emitter.listener_count("change"), 1);
        second.unsubscribe();
        assert_eq!(emitter.listener_count("change"), 0);
    }

    #[test]
    fn events_are_independent() {
        let emitter: Emitter = Emitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let _sub = emitter.on("done", move |_| {
            hits_clone.fetch_add(1, Ordering::Relaxed);
        });

        emitter.emit("change", &());
        assert_eq!(hits.load(Ordering::Relaxed), 0);

        emitter.emit_all(&["change", "done", "done"], &());
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn clear_drops_all_listeners() {
        let emitter: Emitter = Emitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let sub = emitter.on("change", move |_| {
            hits_clone.fetch_add(1, Ordering::Relaxed);
        });

        emitter.clear();
        emitter.emit("change", &());
        assert_eq!(hits.load(Ordering::Relaxed), 0);

        // Unsubscribing after a clear is harmless.
        sub.unsubscribe();
    }

    #[test]
    fn detached_listener_survives_handle() {
        let emitter: Emitter = Emitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        emitter
            .on("change", move |_| {
                hits_clone.fetch_add(1, Ordering::Relaxed);
            })
            .detach();

        emitter.emit("change", &());
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn listener_may_unsubscribe_itself_while_notified() {
        let emitter: Emitter = Emitter::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(AtomicUsize::new(0));

        let sub = {
            let slot = slot.clone();
            let hits = hits.clone();
            emitter.on("change", move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
                slot.lock().take();
            })
        };
        *slot.lock() = Some(sub);

        emitter.emit("change", &());
        emitter.emit("change", &());
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }
}
