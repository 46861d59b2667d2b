//! Per-state configuration.

use std::borrow::Cow;
use std::sync::Arc;

type CompareFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;
type MapFn<T> = Arc<dyn Fn(T) -> T + Send + Sync>;
type DisposeFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Equality test that gates every observable mutation.
///
/// When `comparer(next, prev)` holds, a write is dropped: no change event
/// fires and dependents stay valid.
pub struct Comparer<T> {
    eq: Option<CompareFn<T>>,
}

impl<T> Clone for Comparer<T> {
    fn clone(&self) -> Self {
        Self {
            eq: self.eq.clone(),
        }
    }
}

impl<T: PartialEq> Default for Comparer<T> {
    fn default() -> Self {
        Self::equal()
    }
}

impl<T> Comparer<T> {
    /// Structural equality through `PartialEq`.
    pub fn equal() -> Self
    where
        T: PartialEq,
    {
        Self { eq: None }
    }

    /// Treat every write as a change.
    pub fn never() -> Self {
        Self::custom(|_, _| false)
    }

    /// Compare a projection of the value, e.g. a timestamp or an id.
    pub fn by_key<K, F>(key: F) -> Self
    where
        K: PartialEq,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::custom(move |a, b| key(a) == key(b))
    }

    /// Arbitrary equality predicate.
    pub fn custom<F>(eq: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            eq: Some(Arc::new(eq)),
        }
    }

    /// Whether `next` should be considered equal to `prev`.
    pub fn same(&self, next: &T, prev: &T) -> bool
    where
        T: PartialEq,
    {
        match &self.eq {
            Some(eq) => eq(next, prev),
            None => next == prev,
        }
    }
}

/// Options recognized when creating a state or family.
///
/// ```ignore
/// let options = StateOptions::new()
///     .comparer(Comparer::by_key(|user: &User| user.id))
///     .dispose(|user| tracing::debug!(id = user.id, "dropping user"))
///     .label("current-user");
/// ```
pub struct StateOptions<T> {
    pub(crate) map: Option<MapFn<T>>,
    pub(crate) comparer: Option<Comparer<T>>,
    pub(crate) dispose: Option<DisposeFn<T>>,
    pub(crate) default_value: Option<T>,
    pub(crate) label: Option<Cow<'static, str>>,
}

impl<T> Default for StateOptions<T> {
    fn default() -> Self {
        Self {
            map: None,
            comparer: None,
            dispose: None,
            default_value: None,
            label: None,
        }
    }
}

impl<T: Clone> Clone for StateOptions<T> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
            comparer: self.comparer.clone(),
            dispose: self.dispose.clone(),
            default_value: self.default_value.clone(),
            label: self.label.clone(),
        }
    }
}

impl<T> StateOptions<T> {
    /// Options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform every raw value into the observable value.
    pub fn map<F>(mut self, map: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.map = Some(Arc::new(map));
        self
    }

    /// Equality used to gate writes. Defaults to [`Comparer::equal`].
    pub fn comparer(mut self, comparer: Comparer<T>) -> Self {
        self.comparer = Some(comparer);
        self
    }

    /// Called with the previous raw value whenever it is replaced.
    pub fn dispose<F>(mut self, dispose: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.dispose = Some(Arc::new(dispose));
        self
    }

    /// Value exposed by action-driven states before their first step, and by
    /// streams that finish without yielding.
    pub fn default_value(mut self, value: T) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Name used in logs and [`NodeInfo`](crate::NodeInfo).
    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Field-by-field merge: anything set in `overrides` wins.
    pub fn merge(self, overrides: StateOptions<T>) -> Self {
        Self {
            map: overrides.map.or(self.map),
            comparer: overrides.comparer.or(self.comparer),
            dispose: overrides.dispose.or(self.dispose),
            default_value: overrides.default_value.or(self.default_value),
            label: overrides.label.or(self.label),
        }
    }

    pub(crate) fn apply_map(&self, raw: T) -> T {
        match &self.map {
            Some(map) => map(raw),
            None => raw,
        }
    }

    pub(crate) fn same(&self, next: &T, prev: &T) -> bool
    where
        T: PartialEq,
    {
        match &self.comparer {
            Some(comparer) => comparer.same(next, prev),
            None => next == prev,
        }
    }

    pub(crate) fn dispose_value(&self, value: &T) {
        if let Some(dispose) = &self.dispose {
            dispose(value);
        }
    }

    pub(crate) fn map_fn(&self) -> Option<MapFn<T>> {
        self.map.clone()
    }
}
