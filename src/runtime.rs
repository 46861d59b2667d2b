use crate::arena::{NodeArena, NodeId, NodeInfo};
use crate::error::Result;
use crate::evaluation::Evaluation;
use crate::family::{FamilyArg, StateFamily};
use crate::node::StateValue;
use crate::options::StateOptions;
use crate::scope::{EvaluationScope, Frame};
use std::sync::Arc;

#[derive(Default)]
struct RuntimeInner {
    scope: EvaluationScope,
    arena: NodeArena,
}

/// Owner of the evaluation scope and node arena.
///
/// Every state is created through a runtime and only tracks dependencies
/// read through the same runtime. Runtimes are independent of each other;
/// cloning a runtime yields another handle to the same one.
#[derive(Clone, Default)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn scope(&self) -> &EvaluationScope {
        &self.inner.scope
    }

    pub(crate) fn arena(&self) -> &NodeArena {
        &self.inner.arena
    }

    /// Whether both handles refer to the same runtime.
    pub fn same(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `f` without registering any reads as dependencies.
    ///
    /// Writes stay forbidden if an evaluator is running further up.
    pub fn untracked<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.scope().enter(Frame::Untracked);
        f()
    }

    /// Whether a state evaluator is currently running.
    pub fn is_evaluating(&self) -> bool {
        self.scope().is_evaluating()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.arena().len()
    }

    /// Metadata for a live node.
    pub fn node_info(&self, id: NodeId) -> Option<NodeInfo> {
        self.arena().get(id)
    }

    /// Start a builder whose states share `options`.
    pub fn builder<T: StateValue>(&self, options: StateOptions<T>) -> Builder<T> {
        Builder {
            runtime: self.clone(),
            options,
        }
    }

    /// A state holding `value` until it is set or reset.
    pub fn state<T: StateValue>(&self, value: T) -> StateFamily<T> {
        self.builder(StateOptions::new()).state(value)
    }

    /// A state computed by `compute`; states it reads become its dependencies.
    pub fn computed<T, F>(&self, compute: F) -> StateFamily<T>
    where
        T: StateValue,
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        self.builder(StateOptions::new()).computed(compute)
    }

    /// A computed state whose evaluator may return any [`Evaluation`].
    pub fn computed_with<T, I, F>(&self, compute: F) -> StateFamily<T, (), I>
    where
        T: StateValue,
        I: Send + 'static,
        F: Fn() -> Result<Evaluation<T, I>> + Send + Sync + 'static,
    {
        self.builder(StateOptions::new()).computed_with(compute)
    }

    /// A family of values keyed by argument sequence.
    pub fn family<T, A, F>(&self, init: F) -> StateFamily<T, A>
    where
        T: StateValue,
        A: FamilyArg,
        F: Fn(&[A]) -> Result<T> + Send + Sync + 'static,
    {
        self.builder(StateOptions::new()).family(init)
    }

    /// A family whose initializer may return any [`Evaluation`].
    pub fn family_with<T, A, I, F>(&self, init: F) -> StateFamily<T, A, I>
    where
        T: StateValue,
        A: FamilyArg,
        I: Send + 'static,
        F: Fn(&[A]) -> Result<Evaluation<T, I>> + Send + Sync + 'static,
    {
        self.builder(StateOptions::new()).family_with(init)
    }
}

/// Factory for states that share base options.
///
/// ```ignore
/// let labelled = runtime.builder(StateOptions::new().label("settings"));
/// let theme = labelled.state(Theme::Dark);
/// let locale = labelled.with(StateOptions::new().default_value(Locale::En)).computed(detect);
/// ```
pub struct Builder<T> {
    pub(crate) runtime: Runtime,
    pub(crate) options: StateOptions<T>,
}

impl<T: StateValue> Builder<T> {
    /// A builder whose options are these merged with `overrides`.
    pub fn with(&self, overrides: StateOptions<T>) -> Self {
        Self {
            runtime: self.runtime.clone(),
            options: self.options.clone().merge(overrides),
        }
    }

    /// See [`Runtime::state`].
    pub fn state(&self, value: T) -> StateFamily<T> {
        self.family_with(move |_: &[()]| Ok(Evaluation::Value(value.clone())))
    }

    /// See [`Runtime::computed`].
    pub fn computed<F>(&self, compute: F) -> StateFamily<T>
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        self.family_with(move |_: &[()]| compute().map(Evaluation::Value))
    }

    /// See [`Runtime::computed_with`].
    pub fn computed_with<I, F>(&self, compute: F) -> StateFamily<T, (), I>
    where
        I: Send + 'static,
        F: Fn() -> Result<Evaluation<T, I>> + Send + Sync + 'static,
    {
        self.family_with(move |_: &[()]| compute())
    }

    /// See [`Runtime::family`].
    pub fn family<A, F>(&self, init: F) -> StateFamily<T, A>
    where
        A: FamilyArg,
        F: Fn(&[A]) -> Result<T> + Send + Sync + 'static,
    {
        self.family_with(move |args: &[A]| init(args).map(Evaluation::Value))
    }

    /// See [`Runtime::family_with`].
    pub fn family_with<A, I, F>(&self, init: F) -> StateFamily<T, A, I>
    where
        A: FamilyArg,
        I: Send + 'static,
        F: Fn(&[A]) -> Result<Evaluation<T, I>> + Send + Sync + 'static,
    {
        StateFamily::new(&self.runtime, Arc::new(init), self.options.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kind;

    #[test]
    fn nodes_leave_the_arena_when_dropped() {
        let runtime = Runtime::new();
        assert_eq!(runtime.node_count(), 0);
        let state = runtime.state(1);
        let id = state.id();
        assert_eq!(runtime.node_count(), 1);
        assert!(runtime.node_info(id).is_some());

        drop(state);
        assert_eq!(runtime.node_count(), 0);
        assert!(runtime.node_info(id).is_none());
    }

    #[test]
    fn builder_options_merge() {
        let runtime = Runtime::new();
        let base = runtime.builder(StateOptions::new().label("base").default_value(1));
        let action = base
            .with(StateOptions::new().default_value(5))
            .computed_with(|| Ok(Evaluation::action(|n: i32| Ok(n))));

        assert_eq!(action.current().unwrap(), 5);
        let info = action.info().unwrap();
        assert_eq!(info.label.as_deref(), Some("base"));
        assert_eq!(info.kind, Some(Kind::Action));
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let runtime = Runtime::new();
        let source = runtime.state(1);
        let reader = {
            let source = source.clone();
            let runtime = runtime.clone();
            runtime.clone().computed(move || runtime.untracked(|| source.current()))
        };

        assert_eq!(reader.current().unwrap(), 1);
        source.set(2).unwrap();
        assert_eq!(reader.current().unwrap(), 1);
        assert_eq!(reader.info().unwrap().dependencies, 0);
    }

    #[test]
    fn runtimes_are_isolated() {
        let first = Runtime::new();
        let second = Runtime::new();
        assert!(!first.same(&second));
        assert!(first.same(&first.clone()));

        let _a = first.state(1);
        assert_eq!(second.node_count(), 0);
    }
}
