use crate::arena::{Kind, NodeId, NodeInfo};
use crate::emitter::{Emitter, Listener, Subscribable, Subscription};
use crate::error::{Error, Result};
use crate::evaluation::{Action, Evaluation, Steps};
use crate::hash::{FastHashMap, fast_map};
use crate::loadable::{Pending, Value};
use crate::options::StateOptions;
use crate::runtime::Runtime;
use crate::scope::{Frame, Tracker};
use futures::channel::oneshot;
use futures::stream::{BoxStream, Fuse};
use futures::StreamExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

pub(crate) const CHANGE: &str = "change";

/// Values a state can hold.
///
/// Blanket-implemented; the bound is the one every cached value needs: cloned
/// out to readers, compared to gate writes, shared across handles.
pub trait StateValue: Clone + PartialEq + Send + Sync + 'static {}

impl<T> StateValue for T where T: Clone + PartialEq + Send + Sync + 'static {}

pub(crate) type Evaluator<T, I> = Arc<dyn Fn() -> Result<Evaluation<T, I>> + Send + Sync>;

pub(crate) type SyncSteps<T> = std::iter::Fuse<Box<dyn Iterator<Item = Result<T>> + Send>>;
pub(crate) type AsyncSteps<T> = Fuse<BoxStream<'static, Result<T>>>;

/// Cache slot for raw and observable values.
pub(crate) enum Slot<T> {
    /// Never evaluated.
    Unset,
    /// Evaluated, nothing materialized.
    Vacant,
    Ready(T),
    Pending(Pending<T>),
    /// Sticky evaluation failure.
    Failed(Error),
}

impl<T: Clone> Clone for Slot<T> {
    fn clone(&self) -> Self {
        match self {
            Slot::Unset => Slot::Unset,
            Slot::Vacant => Slot::Vacant,
            Slot::Ready(value) => Slot::Ready(value.clone()),
            Slot::Pending(pending) => Slot::Pending(pending.clone()),
            Slot::Failed(error) => Slot::Failed(error.clone()),
        }
    }
}

impl<T: StateValue> Slot<T> {
    fn read(&self) -> Result<Value<T>> {
        match self {
            Slot::Ready(value) => Ok(Value::Ready(value.clone())),
            Slot::Pending(pending) => Ok(Value::Pending(pending.clone())),
            Slot::Failed(error) => {
                cov_mark::hit!(sticky_error_rethrown);
                Err(error.clone())
            }
            Slot::Unset | Slot::Vacant => Err(Error::Empty),
        }
    }

    fn or_default(default: &Option<T>) -> Self {
        match default {
            Some(value) => Slot::Ready(value.clone()),
            None => Slot::Vacant,
        }
    }
}

/// Stored step cursor.
pub(crate) enum Cursor<T, I> {
    Action(Arc<Mutex<Action<T, I>>>),
    Sync(Arc<Mutex<SyncSteps<T>>>),
    Async {
        steps: Arc<futures::lock::Mutex<AsyncSteps<T>>>,
        /// The step taken at evaluation time; later steps wait for it.
        first: Pending<T>,
    },
}

impl<T, I> Clone for Cursor<T, I> {
    fn clone(&self) -> Self {
        match self {
            Cursor::Action(action) => Cursor::Action(Arc::clone(action)),
            Cursor::Sync(steps) => Cursor::Sync(Arc::clone(steps)),
            Cursor::Async { steps, first } => Cursor::Async {
                steps: Arc::clone(steps),
                first: first.clone(),
            },
        }
    }
}

/// A dependency edge: this node listens to `source`'s change event.
struct Edge {
    _source: Emitter,
    _subscription: Subscription,
}

pub(crate) struct NodeState<T, I> {
    pub(crate) raw: Slot<T>,
    pub(crate) value: Slot<T>,
    pub(crate) needs_evaluation: bool,
    /// Explicitly written since the last reset; blocks cascades.
    pub(crate) changed: bool,
    pub(crate) evaluating: bool,
    /// Bumped by every reset so in-flight steps can tell they are stale.
    pub(crate) generation: u64,
    pub(crate) cursor: Option<Cursor<T, I>>,
    pub(crate) done: bool,
    dependencies: FastHashMap<usize, Edge>,
    waiters: Vec<oneshot::Sender<()>>,
    watchers: Vec<Subscription>,
}

pub(crate) struct Node<T, I> {
    pub(crate) id: NodeId,
    pub(crate) runtime: Runtime,
    evaluator: Evaluator<T, I>,
    pub(crate) options: Arc<StateOptions<T>>,
    emitter: Emitter,
    pub(crate) state: Mutex<NodeState<T, I>>,
}

impl<T, I> Drop for Node<T, I> {
    fn drop(&mut self) {
        self.runtime.arena().remove(self.id);
    }
}

/// Clears the evaluating flag on every exit path of an evaluation.
struct EvaluatingGuard<'a, T, I>(&'a Node<T, I>);

impl<T, I> Drop for EvaluatingGuard<'_, T, I> {
    fn drop(&mut self) {
        self.0.state.lock().evaluating = false;
    }
}

/// Handle to one state node.
///
/// Handles are cheap to clone and all refer to the same node. The node
/// evaluates lazily on first read, caches the result, and re-evaluates only
/// after [`reset`](State::reset), which dependencies trigger automatically
/// when they change.
///
/// # Example
/// ```ignore
/// let runtime = Runtime::new();
/// let count = runtime.state(1);
/// let double = {
///     let count = count.clone();
///     runtime.computed(move || Ok(count.current()? * 2))
/// };
///
/// assert_eq!(double.current()?, 2);
/// count.set(2)?;
/// assert_eq!(double.current()?, 4);
/// ```
pub struct State<T, I = ()> {
    pub(crate) node: Arc<Node<T, I>>,
}

impl<T, I> Clone for State<T, I> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T, I> std::fmt::Debug for State<T, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.node.state.lock();
        f.debug_struct("State")
            .field("id", &self.node.id)
            .field("label", &self.node.options.label)
            .field("needs_evaluation", &state.needs_evaluation)
            .field("changed", &state.changed)
            .finish()
    }
}

impl<T, I> State<T, I>
where
    T: StateValue,
    I: Send + 'static,
{
    pub(crate) fn new(
        runtime: &Runtime,
        evaluator: Evaluator<T, I>,
        options: Arc<StateOptions<T>>,
    ) -> Self {
        let id = runtime.arena().insert(options.label.clone());
        let node = Node {
            id,
            runtime: runtime.clone(),
            evaluator,
            options,
            emitter: Emitter::new(),
            state: Mutex::new(NodeState {
                raw: Slot::Unset,
                value: Slot::Unset,
                needs_evaluation: true,
                changed: false,
                evaluating: false,
                generation: 0,
                cursor: None,
                done: false,
                dependencies: fast_map(),
                waiters: Vec::new(),
                watchers: Vec::new(),
            }),
        };
        Self {
            node: Arc::new(node),
        }
    }

    /// Arena id of this node.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// The runtime this node belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.node.runtime
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Metadata snapshot for this node.
    pub fn info(&self) -> Option<NodeInfo> {
        self.node.runtime.node_info(self.node.id)
    }

    /// Kind recorded at first evaluation.
    pub fn kind(&self) -> Option<Kind> {
        self.info().and_then(|info| info.kind)
    }

    /// Whether the cached value is stale and the next read will evaluate.
    pub fn needs_evaluation(&self) -> bool {
        self.node.state.lock().needs_evaluation
    }

    /// Whether the node was explicitly written since its last reset.
    pub fn is_changed(&self) -> bool {
        self.node.state.lock().changed
    }

    /// Read the value, evaluating if the cache is stale.
    ///
    /// Inside another state's evaluator the read also registers this node as
    /// a dependency of that state. A failed evaluation is returned again on
    /// every read until [`reset`](State::reset).
    pub fn get(&self) -> Result<Value<T>> {
        if let Some(tracker) = self.node.runtime.scope().current() {
            tracker.track(self.node.id, &self.node.emitter);
        }
        self.materialize()
    }

    /// Read the value now: the ready value, or a pending value that has
    /// already settled; otherwise [`Error::Pending`].
    pub fn current(&self) -> Result<T> {
        self.get()?.now()
    }

    pub(crate) fn materialize(&self) -> Result<Value<T>> {
        {
            let state = self.node.state.lock();
            if state.evaluating {
                return Err(Error::Cycle);
            }
            if !state.needs_evaluation {
                return state.value.read();
            }
        }
        self.evaluate()
    }

    /// Like `materialize`, but an empty slot is fine: writes may fill it.
    pub(crate) fn materialize_for_write(&self) -> Result<()> {
        match self.materialize() {
            Ok(_) | Err(Error::Empty) => Ok(()),
            Err(error) => Err(error),
        }
    }

    fn evaluate(&self) -> Result<Value<T>> {
        let node = &*self.node;
        let (previous, generation) = {
            let mut state = node.state.lock();
            if state.evaluating {
                return Err(Error::Cycle);
            }
            if !state.needs_evaluation {
                return state.value.read();
            }
            state.evaluating = true;
            (
                std::mem::replace(&mut state.raw, Slot::Unset),
                state.generation,
            )
        };
        let _evaluating = EvaluatingGuard(node);

        if let Slot::Ready(old) = &previous {
            node.options.dispose_value(old);
        }
        drop(previous);

        let (raw, cursor, done, kind) = {
            let tracker: Arc<dyn Tracker> = Arc::new(self.clone());
            let _frame = node.runtime.scope().enter(Frame::Evaluating(tracker));
            match (node.evaluator)() {
                Ok(evaluation) => {
                    let kind = evaluation.kind();
                    let (raw, cursor, done) = self.classify(evaluation, generation);
                    (raw, cursor, done, Some(kind))
                }
                Err(error) => (Slot::Failed(error), None, false, None),
            }
        };
        let value = self.observable(&raw);

        debug!(
            node = %node.id,
            label = node.options.label.as_deref(),
            failed = matches!(raw, Slot::Failed(_)),
            "evaluated state"
        );

        let result = {
            let mut state = node.state.lock();
            state.raw = raw;
            state.value = value;
            state.cursor = cursor;
            state.done = done;
            state.changed = false;
            state.needs_evaluation = false;
            state.value.read()
        };
        node.runtime.arena().update(node.id, |info| {
            info.evaluations += 1;
            if let Some(kind) = kind {
                info.kind.get_or_insert(kind);
            }
        });
        result
    }

    /// Turn an evaluator result into the raw slot and step cursor.
    fn classify(
        &self,
        evaluation: Evaluation<T, I>,
        generation: u64,
    ) -> (Slot<T>, Option<Cursor<T, I>>, bool) {
        let default = &self.node.options.default_value;
        match evaluation {
            Evaluation::Value(value) => (Slot::Ready(value), None, false),
            Evaluation::Deferred(future) => (Slot::Pending(Pending::new(future)), None, false),
            Evaluation::Action(action) => (
                Slot::or_default(default),
                Some(Cursor::Action(Arc::new(Mutex::new(action)))),
                false,
            ),
            Evaluation::Stream(Steps::Sync(iter)) => {
                let mut steps = iter.fuse();
                match steps.next() {
                    Some(Ok(value)) => (
                        Slot::Ready(value),
                        Some(Cursor::Sync(Arc::new(Mutex::new(steps)))),
                        false,
                    ),
                    Some(Err(error)) => (Slot::Failed(error), None, false),
                    None => (
                        Slot::or_default(default),
                        Some(Cursor::Sync(Arc::new(Mutex::new(steps)))),
                        true,
                    ),
                }
            }
            Evaluation::Stream(Steps::Async(stream)) => {
                let steps = Arc::new(futures::lock::Mutex::new(stream.fuse()));
                let first = Pending::new(first_step(
                    Arc::downgrade(&self.node),
                    generation,
                    Arc::clone(&steps),
                    default.clone(),
                ));
                (
                    Slot::Pending(first.clone()),
                    Some(Cursor::Async { steps, first }),
                    false,
                )
            }
        }
    }

    /// Apply the configured mapper to a raw slot.
    fn observable(&self, raw: &Slot<T>) -> Slot<T> {
        match raw {
            Slot::Ready(value) => Slot::Ready(self.node.options.apply_map(value.clone())),
            Slot::Pending(pending) => match self.node.options.map_fn() {
                Some(map) => Slot::Pending(Pending::map(pending, move |value| map(value))),
                None => Slot::Pending(pending.clone()),
            },
            other => other.clone(),
        }
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.node.runtime.scope().is_evaluating() {
            return Err(Error::SetDuringEvaluation);
        }
        Ok(())
    }

    /// Replace the value.
    ///
    /// Returns `Ok(false)` when the comparer considers `value` equal to the
    /// current raw value; nothing is notified in that case. Fails with
    /// [`Error::SetDuringEvaluation`] when called from inside an evaluator.
    pub fn set(&self, value: T) -> Result<bool> {
        self.ensure_writable()?;
        self.materialize_for_write()?;
        self.commit(Slot::Ready(value))
    }

    /// Replace the value with `reducer(previous raw value)`.
    pub fn update<F>(&self, reducer: F) -> Result<bool>
    where
        F: FnOnce(&T) -> T,
    {
        self.ensure_writable()?;
        self.materialize_for_write()?;
        let previous = match &self.node.state.lock().raw {
            Slot::Ready(value) => value.clone(),
            Slot::Pending(_) => return Err(Error::Pending),
            _ => return Err(Error::Empty),
        };
        self.commit(Slot::Ready(reducer(&previous)))
    }

    /// Replace the value with a pending one. Always counts as a change.
    pub fn set_deferred<F>(&self, future: F) -> Result<bool>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        self.ensure_writable()?;
        self.materialize_for_write()?;
        self.commit(Slot::Pending(Pending::new(future)))
    }

    /// Shared mutation path for `set`, `update` and stepping.
    pub(crate) fn commit(&self, next: Slot<T>) -> Result<bool> {
        let node = &*self.node;
        let previous = node.state.lock().raw.clone();
        let same = match (&next, &previous) {
            (Slot::Ready(next), Slot::Ready(previous)) => node.options.same(next, previous),
            _ => false,
        };
        if same {
            trace!(node = %node.id, "write dropped by comparer");
            return Ok(false);
        }

        let value = self.observable(&next);
        let waiters = {
            let mut state = node.state.lock();
            state.raw = next;
            state.value = value;
            state.changed = true;
            std::mem::take(&mut state.waiters)
        };
        if let Slot::Ready(old) = &previous {
            node.options.dispose_value(old);
        }
        for waiter in waiters {
            let _ = waiter.send(());
        }

        trace!(
            node = %node.id,
            label = node.options.label.as_deref(),
            "state changed"
        );
        node.emitter.emit(CHANGE, &());
        Ok(true)
    }

    /// Invalidate the cache.
    ///
    /// Drops the step cursor and every dependency edge, clears the changed
    /// flag and emits a change event right away; the new value is computed on
    /// the next read.
    pub fn reset(&self) {
        let node = &*self.node;
        let edges = {
            let mut state = node.state.lock();
            state.needs_evaluation = true;
            state.changed = false;
            state.cursor = None;
            state.done = false;
            state.generation += 1;
            std::mem::take(&mut state.dependencies)
        };
        drop(edges);
        node.runtime.arena().update(node.id, |info| info.dependencies = 0);

        debug!(
            node = %node.id,
            label = node.options.label.as_deref(),
            "reset state"
        );
        node.emitter.emit(CHANGE, &());
    }

    fn on_dependency_changed(&self) {
        if self.node.state.lock().changed {
            cov_mark::hit!(cascade_suppressed_by_explicit_set);
            trace!(node = %self.node.id, "explicit write shadows dependency change");
            return;
        }
        trace!(node = %self.node.id, "cascading reset");
        self.reset();
    }

    /// Run `listener` after every change event of this node.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.node.emitter.on(CHANGE, move |_: &()| listener())
    }

    /// Number of change listeners, dependency edges included.
    pub fn subscriber_count(&self) -> usize {
        self.node.emitter.listener_count(CHANGE)
    }

    /// Feed every event of `source` through `transform` into [`set`](State::set).
    ///
    /// The listener lives as long as this node.
    pub fn watch<S, P, F>(&self, source: &S, transform: F) -> Self
    where
        S: Subscribable<P>,
        P: 'static,
        F: Fn(&P) -> T + Send + Sync + 'static,
    {
        let weak: Weak<Node<T, I>> = Arc::downgrade(&self.node);
        let listener: Listener<P> = Arc::new(move |payload: &P| {
            let Some(node) = weak.upgrade() else {
                return;
            };
            let state = State { node };
            if let Err(error) = state.set(transform(payload)) {
                warn!(node = %state.node.id, %error, "watched value was not applied");
            }
        });
        let subscription = source.subscribe_listener(listener);
        self.node.state.lock().watchers.push(subscription);
        self.clone()
    }

    /// Resolves on the next change made through `set`, `update` or a step.
    pub fn changed(&self) -> impl Future<Output = ()> + Send + 'static {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.node.state.lock();
        state.waiters.retain(|waiter| !waiter.is_canceled());
        state.waiters.push(sender);
        drop(state);
        async move {
            let _ = receiver.await;
        }
    }

    pub(crate) fn mark_done(&self, generation: u64) {
        let mut state = self.node.state.lock();
        if state.generation == generation {
            state.done = true;
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.node.state.lock().generation
    }
}

impl<T, I> Tracker for State<T, I>
where
    T: StateValue,
    I: Send + 'static,
{
    fn track(&self, source: NodeId, emitter: &Emitter) {
        if source == self.node.id {
            return;
        }
        let key = emitter.key();
        let count = {
            let mut state = self.node.state.lock();
            if state.dependencies.contains_key(&key) {
                return;
            }
            let weak = Arc::downgrade(&self.node);
            let subscription = emitter.on(CHANGE, move |_: &()| {
                if let Some(node) = weak.upgrade() {
                    State { node }.on_dependency_changed();
                }
            });
            state.dependencies.insert(
                key,
                Edge {
                    _source: emitter.clone(),
                    _subscription: subscription,
                },
            );
            state.dependencies.len()
        };
        trace!(node = %self.node.id, %source, "tracked dependency");
        self.node
            .runtime
            .arena()
            .update(self.node.id, |info| info.dependencies = count);
    }
}

impl<T, I> Subscribable for State<T, I> {
    fn subscribe_listener(&self, listener: Listener<()>) -> Subscription {
        self.node.emitter.on_shared(CHANGE, listener)
    }
}

/// First step of an async stream, taken when the node evaluates.
async fn first_step<T, I>(
    node: Weak<Node<T, I>>,
    generation: u64,
    steps: Arc<futures::lock::Mutex<AsyncSteps<T>>>,
    default: Option<T>,
) -> Result<T>
where
    T: StateValue,
    I: Send + 'static,
{
    let item = steps.lock().await.next().await;
    match item {
        Some(item) => item,
        None => {
            if let Some(node) = node.upgrade() {
                State { node }.mark_done(generation);
            }
            default.ok_or(Error::Empty)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn read_is_memoized() {
        let runtime = Runtime::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let state = runtime.computed(move || {
            calls_clone.fetch_add(1, Ordering::Relaxed);
            Ok(42)
        });

        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert_eq!(state.current().unwrap(), 42);
        assert_eq!(state.current().unwrap(), 42);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(state.info().unwrap().evaluations, 1);
    }

    #[test]
    fn failed_evaluation_is_sticky_until_reset() {
        cov_mark::check!(sticky_error_rethrown);
        let runtime = Runtime::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let state = runtime.computed(move || -> Result<i32> {
            calls_clone.fetch_add(1, Ordering::Relaxed);
            Err(Error::msg("boom"))
        });

        assert!(state.get().is_err());
        assert!(state.get().is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        state.reset();
        assert!(state.get().is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn equal_write_is_dropped() {
        let runtime = Runtime::new();
        let state = runtime.state(5);
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let _sub = state.subscribe(move || {
            hits_clone.fetch_add(1, Ordering::Relaxed);
        });

        assert!(!state.set(5).unwrap());
        assert_eq!(hits.load(Ordering::Relaxed), 0);
        assert!(!state.is_changed());

        assert!(state.set(6).unwrap());
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert!(state.is_changed());
    }

    #[test]
    fn reset_emits_before_recompute() {
        let runtime = Runtime::new();
        let state = runtime.state(1);
        state.set(9).unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let _sub = state.subscribe(move || {
            hits_clone.fetch_add(1, Ordering::Relaxed);
        });

        state.reset();
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert!(state.needs_evaluation());
        assert_eq!(state.current().unwrap(), 1);
    }

    #[test]
    fn mapper_and_dispose_see_raw_values() {
        let runtime = Runtime::new();
        let disposed = Arc::new(Mutex::new(Vec::new()));
        let disposed_clone = disposed.clone();
        let state = runtime
            .builder(
                StateOptions::new()
                    .map(|v: i32| v * 100)
                    .dispose(move |v: &i32| disposed_clone.lock().push(*v)),
            )
            .state(1);

        assert_eq!(state.current().unwrap(), 100);
        state.set(2).unwrap();
        assert_eq!(state.current().unwrap(), 200);
        state.update(|prev| prev + 1).unwrap();
        assert_eq!(state.current().unwrap(), 300);
        assert_eq!(*disposed.lock(), vec![1, 2]);
    }

    #[test]
    fn self_read_is_a_cycle() {
        let runtime = Runtime::new();
        let slot: Arc<Mutex<Option<State<i32>>>> = Arc::new(Mutex::new(None));
        let slot_clone = slot.clone();
        let state = runtime.computed(move || {
            let this = slot_clone.lock().clone();
            match this {
                Some(this) => this.current(),
                None => Ok(0),
            }
        });
        *slot.lock() = Some(state.default_state().clone());

        assert!(matches!(state.get(), Err(Error::Cycle)));
    }

    #[test]
    fn watch_forwards_events() {
        let runtime = Runtime::new();
        let source = runtime.state(1);
        let mirror = runtime.state(0);
        let source_handle = source.default_state().clone();
        mirror.watch(source.default_state(), move |_| {
            source_handle.current().unwrap_or_default() * 10
        });

        source.set(3).unwrap();
        assert_eq!(mirror.current().unwrap(), 30);
    }

    #[test]
    fn changed_resolves_on_next_write() {
        let runtime = Runtime::new();
        let state = runtime.state(0);
        let changed = state.changed();
        state.set(1).unwrap();
        futures::executor::block_on(changed);
    }

    #[test]
    fn dropped_change_waiters_are_pruned() {
        let runtime = Runtime::new();
        let state = runtime.state(0);
        for _ in 0..16 {
            drop(state.changed());
        }
        let pending = state.changed();
        assert_eq!(state.node.state.lock().waiters.len(), 1);

        state.set(1).unwrap();
        futures::executor::block_on(pending);
        assert!(state.node.state.lock().waiters.is_empty());
    }
}
