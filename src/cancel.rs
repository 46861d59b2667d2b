//! Cooperative cancellation.
//!
//! A [`CancelToken`] is only ever *consulted*: nothing here aborts a future
//! that is already running. Drain loops such as [`State::last`](crate::State::last)
//! check the token between steps, and [`Cancellable::then`] checks it before
//! starting the continuation.

use crate::error::{Error, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

struct TokenInner {
    cancelled: AtomicBool,
    parent: Option<CancelToken>,
}

/// Shared cancellation flag, optionally inheriting from a parent token.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    /// A fresh, uncancelled root token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    /// A token that is cancelled when either it or `self` is cancelled.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Request cancellation. Children observe it; parents do not.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Whether this token or any ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        let mut token = Some(self);
        while let Some(current) = token {
            if current.inner.cancelled.load(Ordering::Acquire) {
                return true;
            }
            token = current.inner.parent.as_ref();
        }
        false
    }

    /// `Err(Error::Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A future carrying a [`CancelToken`].
///
/// Awaiting it yields the inner future's result; cancellation only affects
/// code that checks the token.
#[must_use = "futures do nothing unless polled"]
pub struct Cancellable<T> {
    future: BoxFuture<'static, Result<T>>,
    token: CancelToken,
}

impl<T: Send + 'static> Cancellable<T> {
    /// Wrap `future` with a new root token.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self::with_token(future, CancelToken::new())
    }

    /// Wrap `future` with a child of `parent`.
    pub fn with_parent<F>(future: F, parent: &CancelToken) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self::with_token(future, parent.child())
    }

    pub(crate) fn with_token<F>(future: F, token: CancelToken) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            future: future.boxed(),
            token,
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation was requested here or on a parent.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The token consulted by this chain.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Chain a continuation under a child token.
    ///
    /// The continuation is skipped with [`Error::Cancelled`] if the chain was
    /// cancelled by the time `self` settled.
    pub fn then<U, F, Fut>(self, f: F) -> Cancellable<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U>> + Send + 'static,
    {
        let token = self.token.child();
        let check = token.clone();
        let future = async move {
            let value = self.await?;
            check.check()?;
            f(value).await
        };
        Cancellable::with_token(future, token)
    }
}

impl<T> Future for Cancellable<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.poll_unpin(cx)
    }
}
