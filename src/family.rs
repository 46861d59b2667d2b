use crate::error::Result;
use crate::evaluation::Evaluation;
use crate::loadable::Value;
use crate::memo::ArgKeyedMemo;
use crate::node::{Evaluator, State, StateValue};
use crate::options::StateOptions;
use crate::runtime::Runtime;
use parking_lot::Mutex;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;
use tracing::trace;

/// Argument element accepted by families.
pub trait FamilyArg: Hash + Eq + Clone + Send + Sync + 'static {}

impl<A> FamilyArg for A where A: Hash + Eq + Clone + Send + Sync + 'static {}

pub(crate) type Initializer<T, A, I> =
    Arc<dyn Fn(&[A]) -> Result<Evaluation<T, I>> + Send + Sync>;

struct FamilyInner<T, A, I> {
    runtime: Runtime,
    init: Initializer<T, A, I>,
    options: Arc<StateOptions<T>>,
    members: Mutex<ArgKeyedMemo<A, State<T, I>>>,
    default: State<T, I>,
}

/// A keyed collection of states sharing one initializer.
///
/// Each distinct argument sequence gets its own, independent state, created
/// on first request and reused afterwards. The family dereferences to the
/// zero-argument state, so a family created from a single value is used just
/// like a [`State`].
pub struct StateFamily<T, A = (), I = ()> {
    inner: Arc<FamilyInner<T, A, I>>,
}

impl<T, A, I> Clone for StateFamily<T, A, I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, A, I> std::fmt::Debug for StateFamily<T, A, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateFamily")
            .field("default", &self.inner.default)
            .finish_non_exhaustive()
    }
}

impl<T, A, I> Deref for StateFamily<T, A, I> {
    type Target = State<T, I>;

    fn deref(&self) -> &State<T, I> {
        &self.inner.default
    }
}

fn bind<T, A, I>(init: &Initializer<T, A, I>, args: &[A]) -> Evaluator<T, I>
where
    T: StateValue,
    A: FamilyArg,
    I: Send + 'static,
{
    let init = Arc::clone(init);
    let args: Arc<[A]> = Arc::from(args);
    Arc::new(move || init(&args[..]))
}

impl<T, A, I> StateFamily<T, A, I>
where
    T: StateValue,
    A: FamilyArg,
    I: Send + 'static,
{
    pub(crate) fn new(runtime: &Runtime, init: Initializer<T, A, I>, options: StateOptions<T>) -> Self {
        let options = Arc::new(options);
        let default = State::new(runtime, bind(&init, &[]), Arc::clone(&options));
        Self {
            inner: Arc::new(FamilyInner {
                runtime: runtime.clone(),
                init,
                options,
                members: Mutex::new(ArgKeyedMemo::new()),
                default,
            }),
        }
    }

    /// The state for `args`, created on first request.
    ///
    /// An empty argument list returns the default state.
    pub fn family(&self, args: &[A]) -> State<T, I> {
        if args.is_empty() {
            return self.inner.default.clone();
        }
        let inner = &*self.inner;
        let mut members = inner.members.lock();
        members
            .get_or_add(args, |key| {
                trace!(args = key.len(), "creating family member");
                State::new(&inner.runtime, bind(&inner.init, key), Arc::clone(&inner.options))
            })
            .clone()
    }

    /// Read the member for `args`, returning the value together with its
    /// handle.
    pub fn call(&self, args: &[A]) -> Result<(Value<T>, State<T, I>)> {
        let state = self.family(args);
        let value = state.get()?;
        Ok((value, state))
    }

    /// Forget the member for `args`. Outstanding handles keep working; the
    /// next request creates a fresh member.
    pub fn remove(&self, args: &[A]) -> Option<State<T, I>> {
        self.inner.members.lock().delete(args)
    }

    /// Forget every member except the default state.
    pub fn clear(&self) {
        self.inner.members.lock().clear();
    }

    /// Number of members created through [`family`](StateFamily::family),
    /// not counting the default state.
    pub fn member_count(&self) -> usize {
        let mut count = 0;
        self.inner.members.lock().for_each(|_| count += 1);
        count
    }

    /// The zero-argument state.
    pub fn default_state(&self) -> &State<T, I> {
        &self.inner.default
    }
}
