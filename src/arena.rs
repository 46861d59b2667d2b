// Node arena - per-runtime storage for state node metadata
//
// The values themselves live in the nodes; the arena only keeps what the
// runtime wants to answer about a node without touching its value lock:
// its label, the kind it settled on at first evaluation, how many
// dependency edges it currently holds and how often it has evaluated.
//
// NodeId is a lightweight newtype over a slab index. When a node is dropped
// it removes itself from the arena, making its NodeId stale. Accessing a
// stale NodeId returns None.

use parking_lot::RwLock;
use slab::Slab;
use std::borrow::Cow;

/// Identifier of a state node within its [`Runtime`](crate::Runtime).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a NodeId from a raw slab index
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Convert to usize for slab indexing
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node's evaluator produced the first time it ran.
///
/// Recorded once; later evaluations do not re-classify the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// A plain value.
    Value,
    /// A future, exposed as a pending value with a loadable.
    Deferred,
    /// A sync iterator or async stream, stepped with `next()`.
    Stream,
    /// An action function invoked by `next()`.
    Action,
}

/// Snapshot of a node's metadata.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
    /// Label from the state's options, if any.
    pub label: Option<Cow<'static, str>>,
    /// Kind recorded at first evaluation; `None` until then.
    pub kind: Option<Kind>,
    /// Number of dependency edges currently held.
    pub dependencies: usize,
    /// Number of times the evaluator has run.
    pub evaluations: u64,
}

#[derive(Default)]
pub(crate) struct NodeArena {
    nodes: RwLock<Slab<NodeInfo>>,
}

impl NodeArena {
    pub(crate) fn insert(&self, label: Option<Cow<'static, str>>) -> NodeId {
        let mut nodes = self.nodes.write();
        let entry = nodes.vacant_entry();
        let key = entry.key();
        entry.insert(NodeInfo {
            label,
            ..NodeInfo::default()
        });
        NodeId::new(key as u32)
    }

    pub(crate) fn remove(&self, id: NodeId) -> Option<NodeInfo> {
        let mut nodes = self.nodes.write();
        if nodes.contains(id.index()) {
            Some(nodes.remove(id.index()))
        } else {
            None
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<NodeInfo> {
        self.nodes.read().get(id.index()).cloned()
    }

    /// Mutate the metadata of a live node; no-op for stale ids.
    pub(crate) fn update<F>(&self, id: NodeId, f: F)
    where
        F: FnOnce(&mut NodeInfo),
    {
        if let Some(info) = self.nodes.write().get_mut(id.index()) {
            f(info);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.read().len()
    }
}
