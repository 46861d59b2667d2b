//! Stepping action- and sequence-backed states.

use crate::cancel::{CancelToken, Cancellable};
use crate::error::{Error, Result};
use crate::node::{Cursor, Slot, State, StateValue};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::future::IntoFuture;
use tracing::trace;

/// Outcome of [`State::next`].
///
/// `Ready(true)` means the state advanced, `Ready(false)` that there was
/// nothing to advance. Async sequences report through `Pending`; the step
/// runs when the future is awaited.
#[must_use = "a pending step does nothing unless awaited"]
pub enum Advance {
    /// The step already ran.
    Ready(bool),
    /// The step runs when awaited.
    Pending(BoxFuture<'static, Result<bool>>),
}

impl Advance {
    /// The outcome if the step already ran.
    pub fn now(&self) -> Option<bool> {
        match self {
            Advance::Ready(more) => Some(*more),
            Advance::Pending(_) => None,
        }
    }
}

impl std::fmt::Debug for Advance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advance::Ready(more) => f.debug_tuple("Ready").field(more).finish(),
            Advance::Pending(_) => f.write_str("Pending"),
        }
    }
}

impl IntoFuture for Advance {
    type Output = Result<bool>;
    type IntoFuture = BoxFuture<'static, Result<bool>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Advance::Ready(more) => futures::future::ready(Ok(more)).boxed(),
            Advance::Pending(step) => step,
        }
    }
}

impl<T, I> State<T, I>
where
    T: StateValue,
    I: Send + 'static,
{
    /// Advance the state's cursor by one step.
    ///
    /// Actions are called with `input` and always report progress.
    /// Sequences report `false` once exhausted and stay exhausted until
    /// [`reset`](State::reset). States without a cursor report `false`.
    ///
    /// A step whose result arrives after a reset is discarded. Errors from a
    /// step are returned and leave the cached value alone.
    pub fn next(&self, input: I) -> Result<Advance> {
        self.step(Some(input))
    }

    fn step(&self, input: Option<I>) -> Result<Advance> {
        self.ensure_writable()?;
        self.materialize_for_write()?;

        let (cursor, generation, done) = {
            let state = self.node.state.lock();
            (state.cursor.clone(), state.generation, state.done)
        };
        let Some(cursor) = cursor else {
            return Ok(Advance::Ready(false));
        };

        match cursor {
            Cursor::Action(action) => {
                let Some(input) = input else {
                    return Err(Error::NoTerminalValue);
                };
                let produced = {
                    let mut action = action.try_lock().ok_or(Error::Busy)?;
                    (&mut **action)(input)?
                };
                if self.generation() != generation {
                    cov_mark::hit!(stale_step_discarded);
                    trace!(node = %self.node.id, "discarding step from before reset");
                    return Ok(Advance::Ready(false));
                }
                self.commit(Slot::Ready(produced))?;
                Ok(Advance::Ready(true))
            }
            Cursor::Sync(steps) => {
                if done {
                    return Ok(Advance::Ready(false));
                }
                let item = {
                    let mut steps = steps.try_lock().ok_or(Error::Busy)?;
                    steps.next()
                };
                self.forward(generation, item).map(Advance::Ready)
            }
            Cursor::Async { steps, first } => {
                if done {
                    return Ok(Advance::Ready(false));
                }
                let state = self.clone();
                Ok(Advance::Pending(
                    async move {
                        // Steps are taken in order: the evaluation-time one first.
                        let _ = first.await;
                        let item = steps.lock().await.next().await;
                        state.forward(generation, item)
                    }
                    .boxed(),
                ))
            }
        }
    }

    fn forward(&self, generation: u64, item: Option<Result<T>>) -> Result<bool> {
        if self.generation() != generation {
            cov_mark::hit!(stale_step_discarded);
            trace!(node = %self.node.id, "discarding step from before reset");
            return Ok(false);
        }
        match item {
            None => {
                self.mark_done(generation);
                Ok(false)
            }
            Some(Err(error)) => Err(error),
            Some(Ok(value)) => {
                self.commit(Slot::Ready(value))?;
                Ok(true)
            }
        }
    }

    /// Drain the sequence and resolve to its final value.
    ///
    /// Fails right away with [`Error::NoTerminalValue`] for action states.
    /// Cancelling the returned handle stops the drain at the next step
    /// boundary with [`Error::Cancelled`]; a step already in flight still
    /// runs to completion.
    pub fn last(&self) -> Result<Cancellable<T>> {
        self.materialize_for_write()?;
        if let Some(Cursor::Action(_)) = &self.node.state.lock().cursor {
            return Err(Error::NoTerminalValue);
        }

        let token = CancelToken::new();
        let drain = token.clone();
        let state = self.clone();
        let future = async move {
            loop {
                drain.check()?;
                let more = match state.step(None)? {
                    Advance::Ready(more) => more,
                    Advance::Pending(step) => Cancellable::with_parent(step, &drain).await?,
                };
                drain.check()?;
                if !more {
                    break;
                }
            }
            state.materialize()?.resolve().await
        };
        Ok(Cancellable::with_token(future, token))
    }
}
