//! States derived from other states.
//!
//! Everything here is built on ordinary computed states: the derived node
//! reads its sources inside its evaluator, so it follows them through the
//! usual reset cascade. Pending source values produce pending derived values.

use crate::error::{Error, Result};
use crate::evaluation::Evaluation;
use crate::family::{FamilyArg, StateFamily};
use crate::loadable::{Pending, Value};
use crate::node::{State, StateValue};
use crate::options::StateOptions;
use crate::runtime::{Builder, Runtime};
use futures::FutureExt;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

fn settled<T: StateValue>(value: Value<T>) -> Evaluation<T> {
    match value {
        Value::Ready(value) => Evaluation::Value(value),
        Value::Pending(pending) => Evaluation::Deferred(pending.boxed()),
    }
}

impl<T, I> State<T, I>
where
    T: StateValue,
    I: Send + 'static,
{
    /// Derived state evaluated by `derive` over this state's value.
    fn derive_with<U, F>(&self, options: StateOptions<U>, derive: F) -> StateFamily<U>
    where
        U: StateValue,
        F: Fn(Value<T>) -> Result<Evaluation<U>> + Send + Sync + 'static,
    {
        let source = self.clone();
        self.node
            .runtime
            .builder(options)
            .computed_with(move || derive(source.get()?))
    }

    /// Derived state holding `f(value)`.
    pub fn map<U, F>(&self, f: F) -> StateFamily<U>
    where
        U: StateValue,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.derive_with(StateOptions::new(), move |value| {
            let f = Arc::clone(&f);
            Ok(settled(value.map(move |value| f(&value))))
        })
    }

    /// Derived state keeping `value` while `predicate` accepts it and the
    /// last accepted value otherwise.
    ///
    /// Before anything was accepted the derived state holds `default`, or
    /// reads [`Error::Empty`] without one.
    pub fn filter<P>(&self, predicate: P, default: Option<T>) -> StateFamily<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        let accepted = Arc::new(Mutex::new(default));
        self.derive_with(StateOptions::new(), move |value| {
            let select = {
                let predicate = Arc::clone(&predicate);
                let accepted = Arc::clone(&accepted);
                move |value: T| -> Result<T> {
                    let mut accepted = accepted.lock();
                    if predicate(&value) {
                        *accepted = Some(value.clone());
                        return Ok(value);
                    }
                    accepted.clone().ok_or(Error::Empty)
                }
            };
            Ok(match value {
                Value::Ready(value) => Evaluation::Value(select(value)?),
                Value::Pending(pending) => {
                    Evaluation::Deferred(Pending::and_then(&pending, select).boxed())
                }
            })
        })
    }

    /// Derived action state folding this state's values with `f`.
    ///
    /// Every `next(())` folds the source's value at that moment into the
    /// accumulator, starting from `seed` when given and from the first value
    /// otherwise. The seed is also the value shown before the first step.
    /// A source still pending makes the step fail with [`Error::Pending`].
    pub fn reduce<F>(&self, f: F, seed: Option<T>) -> StateFamily<T>
    where
        F: Fn(&T, &T) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let options = match &seed {
            Some(seed) => StateOptions::new().default_value(seed.clone()),
            None => StateOptions::new(),
        };
        let accumulator = Arc::new(Mutex::new(seed));
        let source = self.clone();
        self.node.runtime.builder(options).computed_with(move || {
            let f = Arc::clone(&f);
            let accumulator = Arc::clone(&accumulator);
            let source = source.clone();
            Ok(Evaluation::action(move |()| {
                let value = source.current()?;
                let mut accumulator = accumulator.lock();
                let next = match accumulator.as_ref() {
                    Some(previous) => f(previous, &value),
                    None => value,
                };
                *accumulator = Some(next.clone());
                Ok(next)
            }))
        })
    }

    /// Like [`reduce`](State::reduce) with an accumulator of another type.
    pub fn fold<U, F>(&self, f: F, seed: U) -> StateFamily<U>
    where
        U: StateValue,
        F: Fn(&U, &T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let accumulator = Arc::new(Mutex::new(seed.clone()));
        let source = self.clone();
        let options = StateOptions::new().default_value(seed);
        self.node.runtime.builder(options).computed_with(move || {
            let f = Arc::clone(&f);
            let accumulator = Arc::clone(&accumulator);
            let source = source.clone();
            Ok(Evaluation::action(move |()| {
                let value = source.current()?;
                let mut accumulator = accumulator.lock();
                let next = f(&*accumulator, &value);
                *accumulator = next.clone();
                Ok(next)
            }))
        })
    }
}

impl<T, I> State<Option<T>, I>
where
    T: StateValue,
    I: Send + 'static,
{
    /// [`map`](State::map) applied only to present values.
    pub fn map_some<U, F>(&self, f: F) -> StateFamily<Option<U>>
    where
        U: StateValue,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.map(move |value| value.as_ref().map(&f))
    }
}

/// Inputs accepted by [`Runtime::from`]: single states, collections of them
/// and tuples of up to four.
pub trait Sources: Send + Sync + 'static {
    /// Combined value type.
    type Values: StateValue;

    /// Reject any source that belongs to another runtime.
    fn validate(&self, runtime: &Runtime) -> Result<()>;

    /// Read every source, joining pending values.
    fn read(&self) -> Result<Value<Self::Values>>;
}

impl<T, I> Sources for State<T, I>
where
    T: StateValue,
    I: Send + 'static,
{
    type Values = T;

    fn validate(&self, runtime: &Runtime) -> Result<()> {
        if self.runtime().same(runtime) {
            Ok(())
        } else {
            Err(Error::invalid_state(format!(
                "state {} belongs to a different runtime",
                self.id()
            )))
        }
    }

    fn read(&self) -> Result<Value<T>> {
        self.get()
    }
}

impl<T, A, I> Sources for StateFamily<T, A, I>
where
    T: StateValue,
    A: FamilyArg,
    I: Send + 'static,
{
    type Values = T;

    fn validate(&self, runtime: &Runtime) -> Result<()> {
        self.default_state().validate(runtime)
    }

    fn read(&self) -> Result<Value<T>> {
        self.default_state().get()
    }
}

fn join<V: StateValue>(values: Vec<Value<V>>) -> Value<Vec<V>> {
    if values.iter().all(|value| !value.is_pending()) {
        return Value::Ready(values.into_iter().filter_map(Value::into_ready).collect());
    }
    Value::Pending(Pending::new(futures::future::try_join_all(
        values.into_iter().map(Value::resolve),
    )))
}

impl<S: Sources> Sources for Vec<S> {
    type Values = Vec<S::Values>;

    fn validate(&self, runtime: &Runtime) -> Result<()> {
        self.iter().try_for_each(|source| source.validate(runtime))
    }

    fn read(&self) -> Result<Value<Self::Values>> {
        let values = self.iter().map(Sources::read).collect::<Result<Vec<_>>>()?;
        Ok(join(values))
    }
}

impl<S: Sources> Sources for IndexMap<String, S> {
    type Values = IndexMap<String, S::Values>;

    fn validate(&self, runtime: &Runtime) -> Result<()> {
        self.values().try_for_each(|source| source.validate(runtime))
    }

    fn read(&self) -> Result<Value<Self::Values>> {
        let keys: Vec<String> = self.keys().cloned().collect();
        let values = self.values().map(Sources::read).collect::<Result<Vec<_>>>()?;
        Ok(join(values).map(move |values| keys.into_iter().zip(values).collect()))
    }
}

macro_rules! tuple_sources {
    ($($source:ident $value:ident $idx:tt),+) => {
        impl<$($source: Sources),+> Sources for ($($source,)+) {
            type Values = ($($source::Values,)+);

            fn validate(&self, runtime: &Runtime) -> Result<()> {
                $(self.$idx.validate(runtime)?;)+
                Ok(())
            }

            fn read(&self) -> Result<Value<Self::Values>> {
                let values = ($(self.$idx.read()?,)+);
                if let ($(Value::Ready($value),)+) = &values {
                    return Ok(Value::Ready(($($value.clone(),)+)));
                }
                let ($($value,)+) = values;
                Ok(Value::Pending(Pending::new(async move {
                    Ok(($($value.resolve().await?,)+))
                })))
            }
        }
    };
}

tuple_sources!(A a 0, B b 1);
tuple_sources!(A a 0, B b 1, C c 2);
tuple_sources!(A a 0, B b 1, C c 2, D d 3);

impl<T: StateValue> Builder<T> {
    /// See [`Runtime::from_with`].
    pub fn from_with<S, F>(&self, sources: S, selector: F) -> Result<StateFamily<T>>
    where
        S: Sources,
        F: Fn(S::Values) -> T + Send + Sync + 'static,
    {
        sources.validate(&self.runtime)?;
        let selector = Arc::new(selector);
        Ok(self.computed_with(move || {
            let selector = Arc::clone(&selector);
            Ok(settled(sources.read()?.map(move |values| selector(values))))
        }))
    }

    /// See [`Runtime::from`].
    pub fn from<S>(&self, sources: S) -> Result<StateFamily<T>>
    where
        S: Sources<Values = T>,
    {
        sources.validate(&self.runtime)?;
        Ok(self.computed_with(move || Ok(settled(sources.read()?))))
    }
}

impl Runtime {
    /// Derived state holding the values of `sources`.
    ///
    /// Tuples give tuples, vectors give vectors and string-keyed maps give
    /// maps with the same keys. Fails with [`Error::InvalidState`] if a
    /// source belongs to another runtime.
    pub fn from<S: Sources>(&self, sources: S) -> Result<StateFamily<S::Values>> {
        self.builder(StateOptions::new()).from(sources)
    }

    /// Derived state holding `selector(values of sources)`.
    pub fn from_with<S, U, F>(&self, sources: S, selector: F) -> Result<StateFamily<U>>
    where
        S: Sources,
        U: StateValue,
        F: Fn(S::Values) -> U + Send + Sync + 'static,
    {
        self.builder(StateOptions::new()).from_with(sources, selector)
    }
}

/// Result of [`validate_states`].
pub struct StateList<T, I = ()> {
    /// Whether every element was a state handle.
    pub valid: bool,
    /// Whether the input was a collection.
    pub multiple: bool,
    /// The recognized handles.
    pub states: Vec<State<T, I>>,
}

impl<T, I> std::fmt::Debug for StateList<T, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateList")
            .field("valid", &self.valid)
            .field("multiple", &self.multiple)
            .field("states", &self.states.len())
            .finish()
    }
}

/// Recognize state handles inside a type-erased value.
///
/// Accepts a [`State`], a zero-argument-keyed [`StateFamily`] (as its
/// default state), a `Vec` of states, and a `Vec<Box<dyn Any>>` whose
/// elements are any of the single forms.
pub fn validate_states<T, I>(value: &dyn Any) -> StateList<T, I>
where
    T: StateValue,
    I: Send + 'static,
{
    if let Some(state) = single::<T, I>(value) {
        return StateList {
            valid: true,
            multiple: false,
            states: vec![state],
        };
    }
    if let Some(states) = value.downcast_ref::<Vec<State<T, I>>>() {
        return StateList {
            valid: true,
            multiple: true,
            states: states.clone(),
        };
    }
    if let Some(items) = value.downcast_ref::<Vec<Box<dyn Any + Send + Sync>>>() {
        let mut valid = true;
        let mut states = Vec::with_capacity(items.len());
        for item in items {
            let item: &dyn Any = &**item;
            match single::<T, I>(item) {
                Some(state) => states.push(state),
                None => valid = false,
            }
        }
        return StateList {
            valid,
            multiple: true,
            states,
        };
    }
    StateList {
        valid: false,
        multiple: false,
        states: Vec::new(),
    }
}

fn single<T, I>(value: &dyn Any) -> Option<State<T, I>>
where
    T: StateValue,
    I: Send + 'static,
{
    if let Some(state) = value.downcast_ref::<State<T, I>>() {
        return Some(state.clone());
    }
    value
        .downcast_ref::<StateFamily<T, (), I>>()
        .map(|family| family.default_state().clone())
}
