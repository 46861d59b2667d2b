use crate::arena::Kind;
use crate::error::Result;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use std::future::Future;

/// Boxed action invoked by `State::next`.
pub type Action<T, I> = Box<dyn FnMut(I) -> Result<T> + Send>;

/// Result of running a state's evaluator.
///
/// The variant decides how the node behaves for its whole lifetime: plain
/// values are cached, futures become pending values, streams and actions are
/// stepped with `next()`.
pub enum Evaluation<T, I = ()> {
    /// A value, cached as is.
    Value(T),
    /// A future; the node exposes it as a pending value.
    Deferred(BoxFuture<'static, Result<T>>),
    /// A sequence of values. The first item is taken at evaluation time,
    /// later ones by `next()`.
    Stream(Steps<T>),
    /// An action. The node shows its default value until `next(input)` runs
    /// the action and stores what it returns.
    Action(Action<T, I>),
}

/// The two shapes of stepped sequence.
pub enum Steps<T> {
    /// Items are produced synchronously.
    Sync(Box<dyn Iterator<Item = Result<T>> + Send>),
    /// Items are produced asynchronously.
    Async(BoxStream<'static, Result<T>>),
}

impl<T, I> From<T> for Evaluation<T, I> {
    fn from(value: T) -> Self {
        Evaluation::Value(value)
    }
}

impl<T: Send + 'static> Evaluation<T> {
    /// A plain value.
    pub fn value(value: T) -> Self {
        Evaluation::Value(value)
    }

    /// A future resolving to the value.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Evaluation::Deferred(future.boxed())
    }

    /// Infallible synchronous sequence.
    pub fn iter<It>(items: It) -> Self
    where
        It: IntoIterator<Item = T>,
        It::IntoIter: Send + 'static,
    {
        Evaluation::Stream(Steps::Sync(Box::new(items.into_iter().map(Ok))))
    }

    /// Fallible synchronous sequence.
    pub fn try_iter<It>(items: It) -> Self
    where
        It: IntoIterator<Item = Result<T>>,
        It::IntoIter: Send + 'static,
    {
        Evaluation::Stream(Steps::Sync(Box::new(items.into_iter())))
    }

    /// Infallible asynchronous sequence.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Evaluation::Stream(Steps::Async(stream.map(Ok).boxed()))
    }

    /// Fallible asynchronous sequence.
    pub fn try_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Evaluation::Stream(Steps::Async(stream.boxed()))
    }
}

impl<T, I> Evaluation<T, I> {
    /// An action driven by `next(input)`.
    ///
    /// The input type is taken from the closure, e.g. `|n: u32| Ok(n * 2)`.
    /// Sequences for states with a non-unit input are built from the
    /// variants directly.
    pub fn action<F>(action: F) -> Self
    where
        F: FnMut(I) -> Result<T> + Send + 'static,
    {
        Evaluation::Action(Box::new(action))
    }

    pub(crate) fn kind(&self) -> Kind {
        match self {
            Evaluation::Value(_) => Kind::Value,
            Evaluation::Deferred(_) => Kind::Deferred,
            Evaluation::Stream(_) => Kind::Stream,
            Evaluation::Action(_) => Kind::Action,
        }
    }
}
