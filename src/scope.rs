//! Evaluation scope: which state, if any, is currently being computed.
//!
//! Each [`Runtime`](crate::Runtime) owns one frame stack. Entering a node's
//! evaluator pushes a frame that lets every state read inside it register
//! itself as a dependency; the [`ScopeGuard`] pops it again on every exit path,
//! including unwinding. Frames are only visible for the synchronous extent of
//! the evaluator call: a future returned by the evaluator is polled after the
//! guard is gone, so reads after an `.await` are not tracked.

use crate::arena::NodeId;
use crate::emitter::Emitter;
use parking_lot::Mutex;
use std::sync::Arc;

/// Receiver of dependency registrations for one evaluating node.
pub(crate) trait Tracker: Send + Sync {
    /// Record that the evaluating node read `source`.
    fn track(&self, source: NodeId, emitter: &Emitter);
}

#[derive(Clone)]
pub(crate) enum Frame {
    /// A node evaluator is running; reads register with the tracker.
    Evaluating(Arc<dyn Tracker>),
    /// Reads are not tracked (see `Runtime::untracked`).
    Untracked,
}

#[derive(Default)]
pub(crate) struct EvaluationScope {
    frames: Mutex<Vec<Frame>>,
}

impl EvaluationScope {
    /// Push `frame` until the returned guard is dropped.
    pub(crate) fn enter(&self, frame: Frame) -> ScopeGuard<'_> {
        let mut frames = self.frames.lock();
        let depth = frames.len();
        frames.push(frame);
        ScopeGuard { scope: self, depth }
    }

    /// Tracker of the innermost frame, if that frame tracks.
    pub(crate) fn current(&self) -> Option<Arc<dyn Tracker>> {
        match self.frames.lock().last() {
            Some(Frame::Evaluating(tracker)) => Some(Arc::clone(tracker)),
            Some(Frame::Untracked) | None => None,
        }
    }

    /// Whether any evaluator is on the stack, tracked or not.
    pub(crate) fn is_evaluating(&self) -> bool {
        self.frames
            .lock()
            .iter()
            .any(|frame| matches!(frame, Frame::Evaluating(_)))
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.frames.lock().len()
    }
}

/// Restores the enclosing frame when dropped.
pub(crate) struct ScopeGuard<'a> {
    scope: &'a EvaluationScope,
    depth: usize,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.scope.frames.lock().truncate(self.depth);
    }
}
