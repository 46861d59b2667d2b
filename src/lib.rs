#![deny(missing_docs)]

//! Lazy, memoized state families with automatic dependency tracking.
//!
//! A state is a cached value produced by an evaluator. Nothing runs until the
//! first read; later reads return the cache. States read inside an evaluator
//! become its dependencies, and when one of them changes the dependent is
//! reset and recomputed on its next read.
//!
//! # Quick Start
//!
//! ```ignore
//! use lazystate::{Runtime, Evaluation};
//!
//! let runtime = Runtime::new();
//! let count = runtime.state(0);
//! let double = {
//!     let count = count.clone();
//!     runtime.computed(move || Ok(count.current()? * 2))
//! };
//!
//! count.update(|n| n + 1)?;
//! assert_eq!(double.current()?, 2);
//! ```
//!
//! # Core Types
//!
//! - [`Runtime`] - Owns the evaluation scope and node arena. All states are created through it.
//! - [`State<T, I>`] - Handle to one lazily evaluated, cached node.
//! - [`StateFamily<T, A, I>`] - States keyed by argument sequence. Derefs to its zero-argument state.
//! - [`Value<T>`] - What a read returns: ready, or [`Pending`] with a [`Loadable`] lifecycle.
//! - [`Evaluation<T, I>`] - What an evaluator returns: a value, a future, a sequence or an action.
//!
//! # Families
//!
//! ```ignore
//! let user = runtime.family(|args: &[u64]| load_user(args[0]));
//! let alice = user.family(&[1]);   // created on first request
//! let again = user.family(&[1]);   // same node
//! ```
//!
//! # Writes
//!
//! ```ignore
//! state.set(5)?;                 // Ok(false) if equal under the comparer
//! state.update(|n| n + 1)?;
//! state.reset();                 // recompute on next read
//! ```
//!
//! A write marks the state as changed, which shields it from resets cascading
//! out of its dependencies until it is reset itself. Writes from inside an
//! evaluator fail with [`Error::SetDuringEvaluation`].
//!
//! # Sequences and Actions
//!
//! ```ignore
//! let pages = runtime.computed_with(|| Ok(Evaluation::iter(["a", "b", "c"])));
//! pages.next(())?;                     // "b"
//! let last = block_on(pages.last()?)?; // "c"
//! ```
//!
//! # Composition
//!
//! ```ignore
//! let label = count.map(|n| format!("{n} items"));
//! let both = runtime.from((count.clone(), label))?;
//! let total = count.reduce(|acc, n| acc + n, Some(0));
//! ```

mod arena;
mod cancel;
mod derive;
mod emitter;
mod error;
mod evaluation;
mod family;
mod hash;
mod loadable;
mod memo;
mod node;
mod options;
mod runtime;
mod scope;
mod step;

// Core types
pub use family::{FamilyArg, StateFamily};
pub use node::{State, StateValue};
pub use runtime::{Builder, Runtime};

// Evaluation and reads
pub use evaluation::{Action, Evaluation, Steps};
pub use loadable::{LoadState, LoadStatus, Loadable, Pending, Value};
pub use step::Advance;

// Composition
pub use derive::{StateList, Sources, validate_states};

// Configuration, errors and support types
pub use arena::{Kind, NodeId, NodeInfo};
pub use cancel::{CancelToken, Cancellable};
pub use emitter::{Emitter, EventSource, Listener, Subscribable, Subscription};
pub use error::{Error, Result};
pub use memo::ArgKeyedMemo;
pub use options::{Comparer, StateOptions};

#[cfg(test)]
mod tests;
