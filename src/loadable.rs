//! Pending values and their observable loading lifecycle.
//!
//! A [`Pending<T>`] is a cloneable, shared future. Whichever clone is awaited
//! first drives it; when it settles, its [`Loadable`] moves from `Loading` to
//! `HasValue` or `Error` exactly once and notifies its `"done"` listeners.
//! Nothing is emitted while the pending value is being built, so listeners
//! attached right after construction never miss the transition.

use crate::emitter::{Emitter, Listener, Subscribable, Subscription};
use crate::error::{Error, Result};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::RwLock;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

const DONE: &str = "done";

/// Lifecycle phase of a pending value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// Not settled yet.
    Loading,
    /// Settled successfully.
    HasValue,
    /// Settled with an error.
    Error,
}

/// Full lifecycle state, including the settled value or error.
#[derive(Clone, Debug)]
pub enum LoadState<T> {
    /// Not settled yet.
    Loading,
    /// Settled successfully.
    HasValue(T),
    /// Settled with an error.
    Error(Error),
}

impl<T> LoadState<T> {
    /// The phase without its payload.
    pub fn status(&self) -> LoadStatus {
        match self {
            LoadState::Loading => LoadStatus::Loading,
            LoadState::HasValue(_) => LoadStatus::HasValue,
            LoadState::Error(_) => LoadStatus::Error,
        }
    }
}

struct LoadableInner<T> {
    state: RwLock<LoadState<T>>,
    /// Created on first subscribe.
    emitter: OnceLock<Emitter>,
}

/// Observable descriptor of a [`Pending`] value.
pub struct Loadable<T> {
    inner: Arc<LoadableInner<T>>,
}

impl<T> Clone for Loadable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Loadable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loadable")
            .field("status", &self.status())
            .finish()
    }
}

impl<T> Loadable<T> {
    fn new() -> Self {
        Self {
            inner: Arc::new(LoadableInner {
                state: RwLock::new(LoadState::Loading),
                emitter: OnceLock::new(),
            }),
        }
    }

    /// Current phase.
    pub fn status(&self) -> LoadStatus {
        self.inner.state.read().status()
    }

    /// The settled value, if any.
    pub fn value(&self) -> Option<T>
    where
        T: Clone,
    {
        match &*self.inner.state.read() {
            LoadState::HasValue(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The settled error, if any.
    pub fn error(&self) -> Option<Error> {
        match &*self.inner.state.read() {
            LoadState::Error(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// Copy of the full state.
    pub fn snapshot(&self) -> LoadState<T>
    where
        T: Clone,
    {
        self.inner.state.read().clone()
    }

    /// Run `listener` when the value settles.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.emitter().on(DONE, move |_: &()| listener())
    }

    fn emitter(&self) -> &Emitter {
        self.inner.emitter.get_or_init(Emitter::new)
    }

    fn settle(&self, result: &Result<T>)
    where
        T: Clone,
    {
        {
            let mut state = self.inner.state.write();
            if !matches!(*state, LoadState::Loading) {
                return;
            }
            *state = match result {
                Ok(value) => LoadState::HasValue(value.clone()),
                Err(error) => LoadState::Error(error.clone()),
            };
        }
        if let Some(emitter) = self.inner.emitter.get() {
            emitter.emit(DONE, &());
        }
    }
}

impl<T: 'static> Subscribable for Loadable<T> {
    fn subscribe_listener(&self, listener: Listener<()>) -> Subscription {
        self.emitter().on_shared(DONE, listener)
    }
}

/// A shared, not-yet-settled value.
///
/// Cloning is cheap; every clone resolves to the same result and the wrapped
/// future runs once.
pub struct Pending<T> {
    future: Shared<BoxFuture<'static, Result<T>>>,
    loadable: Loadable<T>,
}

impl<T> Clone for Pending<T> {
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
            loadable: self.loadable.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("status", &self.loadable.status())
            .finish()
    }
}

impl<T> Pending<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap `future`.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let loadable = Loadable::new();
        let settle = loadable.clone();
        let future = async move {
            let result = future.await;
            settle.settle(&result);
            result
        }
        .boxed()
        .shared();
        Self { future, loadable }
    }

    /// The lifecycle descriptor of this value.
    pub fn loadable(&self) -> &Loadable<T> {
        &self.loadable
    }

    /// The result if already settled.
    pub fn peek(&self) -> Option<Result<T>> {
        match self.loadable.snapshot() {
            LoadState::Loading => None,
            LoadState::HasValue(value) => Some(Ok(value)),
            LoadState::Error(error) => Some(Err(error)),
        }
    }

    /// A new pending value that applies `f` after this one settles.
    pub fn map<U, F>(&self, f: F) -> Pending<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let source = self.clone();
        Pending::new(async move { source.await.map(f) })
    }

    /// Like [`map`](Pending::map) for fallible transforms.
    pub fn and_then<U, F>(&self, f: F) -> Pending<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        let source = self.clone();
        Pending::new(async move { source.await.and_then(f) })
    }
}

impl<T> Future for Pending<T>
where
    T: Clone,
{
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.poll_unpin(cx)
    }
}

/// What a state read produced.
#[derive(Clone, Debug)]
pub enum Value<T> {
    /// A materialized value.
    Ready(T),
    /// A value that is still being produced.
    Pending(Pending<T>),
}

impl<T> Value<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The materialized value, if not pending.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Value::Ready(value) => Some(value),
            Value::Pending(_) => None,
        }
    }

    /// Consume into the materialized value, if not pending.
    pub fn into_ready(self) -> Option<T> {
        match self {
            Value::Ready(value) => Some(value),
            Value::Pending(_) => None,
        }
    }

    /// Whether the value is still being produced.
    pub fn is_pending(&self) -> bool {
        matches!(self, Value::Pending(_))
    }

    /// The lifecycle descriptor, for pending values.
    pub fn loadable(&self) -> Option<&Loadable<T>> {
        match self {
            Value::Ready(_) => None,
            Value::Pending(pending) => Some(pending.loadable()),
        }
    }

    /// The value now: ready, or already settled; otherwise [`Error::Pending`].
    pub fn now(&self) -> Result<T> {
        match self {
            Value::Ready(value) => Ok(value.clone()),
            Value::Pending(pending) => pending.peek().unwrap_or(Err(Error::Pending)),
        }
    }

    /// Resolve to the value, waiting for settlement if needed.
    pub fn resolve(self) -> BoxFuture<'static, Result<T>> {
        match self {
            Value::Ready(value) => futures::future::ready(Ok(value)).boxed(),
            Value::Pending(pending) => pending.boxed(),
        }
    }

    /// Apply `f` now, or after settlement.
    pub fn map<U, F>(self, f: F) -> Value<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self {
            Value::Ready(value) => Value::Ready(f(value)),
            Value::Pending(pending) => Value::Pending(Pending::map(&pending, f)),
        }
    }
}

impl<T: PartialEq> PartialEq<T> for Value<T> {
    fn eq(&self, other: &T) -> bool {
        match self {
            Value::Ready(value) => value == other,
            Value::Pending(_) => false,
        }
    }
}
