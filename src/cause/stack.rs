//! Cause Stack Manager
//!
//! Causes are pushed and popped as the tick thread descends into and out of
//! work. Frames checkpoint the stack: closing a frame truncates the cause
//! sequence back to the length it had when the frame opened and restores
//! the context map from that moment.
//!
//! Frames close in strict LIFO order. Closing any frame but the innermost
//! one is a fatal usage error; the stack is left untouched and the error is
//! reported, never silently corrected.

use std::any::Any;
use std::sync::{Mutex, MutexGuard};
use std::thread;

use super::context::{Context, ContextKey};
use super::errors::{CauseError, CauseResult, FrameId};
use super::object::CauseHandle;
use super::snapshot::Cause;
use crate::affinity::ThreadAffinity;
use crate::observability::{LogEvent, Logger};

#[derive(Debug)]
struct FrameRecord {
    id: FrameId,
    cause_len: usize,
    context: Context,
}

#[derive(Default)]
struct StackState {
    causes: Vec<CauseHandle>,
    /// Objects below this index belong to the root and can never be popped
    pinned: usize,
    context: Context,
    frames: Vec<FrameRecord>,
    next_frame: u64,
    cached: Option<Cause>,
}

impl StackState {
    fn invalidate(&mut self) {
        self.cached = None;
    }

    fn pop_floor(&self) -> usize {
        self.frames
            .last()
            .map(|f| f.cause_len)
            .unwrap_or(0)
            .max(self.pinned)
    }
}

/// Owner-thread cause stack with scoped frames
pub struct CauseStackManager {
    affinity: ThreadAffinity,
    state: Mutex<StackState>,
    panic_on_fatal: bool,
}

impl CauseStackManager {
    /// Create an empty stack bound to the affinity's owner thread
    pub fn new(affinity: ThreadAffinity) -> Self {
        Self {
            affinity,
            state: Mutex::new(StackState::default()),
            panic_on_fatal: true,
        }
    }

    /// Create a stack whose bottom entry is `root`, pinned below every frame
    pub fn with_root(affinity: ThreadAffinity, root: CauseHandle) -> Self {
        let state = StackState {
            causes: vec![root],
            pinned: 1,
            ..StackState::default()
        };
        Self {
            affinity,
            state: Mutex::new(state),
            panic_on_fatal: true,
        }
    }

    /// Whether dropping a frame guard out of order panics (default) or only logs
    pub fn set_panic_on_fatal(&mut self, panic_on_fatal: bool) {
        self.panic_on_fatal = panic_on_fatal;
    }

    fn lock(&self) -> CauseResult<MutexGuard<'_, StackState>> {
        self.state
            .lock()
            .map_err(|_| CauseError::Internal("cause stack lock poisoned".into()))
    }

    /// Append a causal object
    pub fn push_cause(&self, object: CauseHandle) -> CauseResult<()> {
        self.affinity.check("push_cause")?;
        let mut state = self.lock()?;
        state.causes.push(object);
        state.invalidate();
        Ok(())
    }

    /// Remove the newest causal object, never crossing the innermost frame
    pub fn pop_cause(&self) -> CauseResult<CauseHandle> {
        self.affinity.check("pop_cause")?;
        let mut state = self.lock()?;
        let floor = state.pop_floor();
        if state.causes.len() <= floor {
            return Err(match state.frames.last() {
                Some(frame) if frame.cause_len >= state.pinned => CauseError::PopBelowFrame {
                    frame: frame.id,
                    floor,
                },
                _ if state.pinned > 0 => CauseError::PopRoot,
                _ => CauseError::EmptyCause,
            });
        }
        let popped = state.causes.pop().ok_or(CauseError::EmptyCause)?;
        state.invalidate();
        Ok(popped)
    }

    /// Newest causal object without removing it
    pub fn peek_cause(&self) -> CauseResult<Option<CauseHandle>> {
        Ok(self.lock()?.causes.last().cloned())
    }

    /// Set a context entry, overwriting any earlier value for the key
    pub fn add_context<T: Any + Send + Sync>(&self, key: &ContextKey<T>, value: T) -> CauseResult<()> {
        self.affinity.check("add_context")?;
        let mut state = self.lock()?;
        if state.frames.is_empty() && state.pinned == 0 {
            return Err(CauseError::NoActiveFrame);
        }
        state.context.insert(key, value);
        state.invalidate();
        Ok(())
    }

    /// Remove a context entry; returns true if it existed
    pub fn remove_context<T>(&self, key: &ContextKey<T>) -> CauseResult<bool> {
        self.affinity.check("remove_context")?;
        let mut state = self.lock()?;
        let removed = state.context.remove(key);
        if removed {
            state.invalidate();
        }
        Ok(removed)
    }

    /// Current value for a context key
    pub fn context_value<T: Any + Clone>(&self, key: &ContextKey<T>) -> CauseResult<Option<T>> {
        Ok(self.lock()?.context.get(key).cloned())
    }

    /// Snapshot of the current context map
    pub fn current_context(&self) -> CauseResult<Context> {
        Ok(self.lock()?.context.clone())
    }

    /// Immutable snapshot of the current cause and context
    pub fn current_cause(&self) -> CauseResult<Cause> {
        let mut state = self.lock()?;
        if let Some(cached) = &state.cached {
            return Ok(cached.clone());
        }
        if state.causes.is_empty() {
            return Err(CauseError::EmptyCause);
        }
        let cause = Cause::from_parts(state.causes.clone().into(), state.context.clone());
        state.cached = Some(cause.clone());
        Ok(cause)
    }

    /// Open a scoped frame. Dropping or closing the guard restores the stack.
    pub fn push_frame(&self) -> CauseResult<CauseStackFrame<'_>> {
        let id = self.open_frame()?;
        Ok(CauseStackFrame {
            manager: self,
            id,
            closed: false,
        })
    }

    pub(crate) fn open_frame(&self) -> CauseResult<FrameId> {
        self.affinity.check("push_cause_frame")?;
        let mut state = self.lock()?;
        let id = FrameId(state.next_frame);
        state.next_frame += 1;
        let record = FrameRecord {
            id,
            cause_len: state.causes.len(),
            context: state.context.clone(),
        };
        state.frames.push(record);
        Ok(id)
    }

    pub(crate) fn close_frame(&self, id: FrameId) -> CauseResult<()> {
        self.affinity.check("pop_cause_frame")?;
        let mut state = self.lock()?;

        let top = state.frames.last().map(|f| f.id);
        if top != Some(id) {
            let err = CauseError::MismatchedFrame { closing: id, top };
            drop(state);
            self.report_fatal(&err);
            return Err(err);
        }

        if let Some(frame) = state.frames.pop() {
            state.causes.truncate(frame.cause_len);
            state.context = frame.context;
            state.invalidate();
        }
        Ok(())
    }

    fn report_fatal(&self, err: &CauseError) {
        self.affinity.observer().fatal(err.code());
        let depth = self.frame_depth().to_string();
        let message = err.to_string();
        Logger::event(
            LogEvent::FrameMismatch,
            &[
                ("code", err.code()),
                ("frame_depth", &depth),
                ("reason", &message),
            ],
        );
    }

    /// Number of open frames
    pub fn frame_depth(&self) -> usize {
        self.state.lock().map(|s| s.frames.len()).unwrap_or(0)
    }

    /// Number of causal objects on the stack, root included
    pub fn cause_len(&self) -> usize {
        self.state.lock().map(|s| s.causes.len()).unwrap_or(0)
    }

}

/// Scoped cause frame.
///
/// `close` reports an out-of-order close as an error. Dropping the guard
/// closes it too; an out-of-order drop is fatal and panics unless the
/// thread is already unwinding or the manager was told not to.
pub struct CauseStackFrame<'a> {
    manager: &'a CauseStackManager,
    id: FrameId,
    closed: bool,
}

impl<'a> CauseStackFrame<'a> {
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Push a cause within this frame
    pub fn push_cause(&self, object: CauseHandle) -> CauseResult<()> {
        self.manager.push_cause(object)
    }

    /// Add context within this frame
    pub fn add_context<T: Any + Send + Sync>(&self, key: &ContextKey<T>, value: T) -> CauseResult<()> {
        self.manager.add_context(key, value)
    }

    /// Close the frame, restoring the stack to its state at open.
    ///
    /// An out-of-order close consumes the guard but leaves its record on
    /// the stack; the stack cannot be trusted afterwards.
    pub fn close(mut self) -> CauseResult<()> {
        self.closed = true;
        self.manager.close_frame(self.id)
    }
}

impl Drop for CauseStackFrame<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.manager.close_frame(self.id) {
            if err.is_fatal() && self.manager.panic_on_fatal && !thread::panicking() {
                panic!("cause frame discipline violated: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cause::{keys, GameRoot};
    use crate::observability::TrackerMetrics;

    #[derive(Debug)]
    struct Source(&'static str);

    impl crate::cause::Causal for Source {}

    fn manager() -> (CauseStackManager, Arc<TrackerMetrics>) {
        let metrics = Arc::new(TrackerMetrics::new());
        let affinity = ThreadAffinity::bind_current(metrics.clone());
        let root = CauseHandle::new(GameRoot::new("test"));
        (CauseStackManager::with_root(affinity, root), metrics)
    }

    #[test]
    fn test_frame_restores_causes_and_context() {
        let (stack, _) = manager();
        stack.add_context(&keys::TICK, 1).unwrap();
        let before = stack.current_cause().unwrap();

        {
            let frame = stack.push_frame().unwrap();
            frame.push_cause(CauseHandle::new(Source("piston"))).unwrap();
            frame.add_context(&keys::TICK, 2).unwrap();
            assert_eq!(stack.cause_len(), 2);
            assert_eq!(stack.context_value(&keys::TICK).unwrap(), Some(2));
        }

        assert_eq!(stack.current_cause().unwrap(), before);
        assert_eq!(stack.context_value(&keys::TICK).unwrap(), Some(1));
    }

    #[test]
    fn test_snapshot_survives_frame_close() {
        let (stack, _) = manager();
        let frame = stack.push_frame().unwrap();
        frame.push_cause(CauseHandle::new(Source("tnt"))).unwrap();
        let inner = stack.current_cause().unwrap();
        frame.close().unwrap();

        assert_eq!(inner.len(), 2);
        assert_eq!(inner.first::<Source>().unwrap().0, "tnt");
        assert_eq!(stack.current_cause().unwrap().len(), 1);
    }

    #[test]
    fn test_out_of_order_close_is_rejected() {
        let (stack, metrics) = manager();
        let outer = stack.push_frame().unwrap();
        let inner = stack.push_frame().unwrap();
        let outer_id = outer.id();

        let err = outer.close().unwrap_err();
        assert!(matches!(err, CauseError::MismatchedFrame { closing, .. } if closing == outer_id));
        assert!(err.is_fatal());
        assert_eq!(metrics.fatal_errors(), 1);
        assert_eq!(stack.frame_depth(), 2);

        inner.close().unwrap();
    }

    #[test]
    #[should_panic(expected = "cause frame discipline violated")]
    fn test_out_of_order_drop_panics() {
        let (stack, _) = manager();
        let outer = stack.push_frame().unwrap();
        let _inner = stack.push_frame().unwrap();
        drop(outer);
    }

    #[test]
    fn test_pop_cause_stops_at_frame() {
        let (stack, _) = manager();
        stack.push_cause(CauseHandle::new(Source("a"))).unwrap();
        let frame = stack.push_frame().unwrap();
        frame.push_cause(CauseHandle::new(Source("b"))).unwrap();

        let popped = stack.pop_cause().unwrap();
        assert_eq!(popped.downcast_ref::<Source>().unwrap().0, "b");
        assert!(matches!(
            stack.pop_cause(),
            Err(CauseError::PopBelowFrame { floor: 2, .. })
        ));
        frame.close().unwrap();

        stack.pop_cause().unwrap();
        assert!(matches!(stack.pop_cause(), Err(CauseError::PopRoot)));
    }

    #[test]
    fn test_empty_stack_without_root() {
        let affinity = ThreadAffinity::bind_current(Arc::new(TrackerMetrics::new()));
        let stack = CauseStackManager::new(affinity);

        assert!(matches!(stack.current_cause(), Err(CauseError::EmptyCause)));
        assert!(matches!(
            stack.add_context(&keys::TICK, 1),
            Err(CauseError::NoActiveFrame)
        ));

        let frame = stack.push_frame().unwrap();
        frame.add_context(&keys::TICK, 1).unwrap();
    }

    #[test]
    fn test_cached_cause_is_invalidated() {
        let (stack, _) = manager();
        let first = stack.current_cause().unwrap();
        assert_eq!(stack.current_cause().unwrap(), first);

        stack.push_cause(CauseHandle::new(Source("x"))).unwrap();
        assert_ne!(stack.current_cause().unwrap(), first);
    }

    #[test]
    fn test_other_thread_cannot_push() {
        let (stack, metrics) = manager();
        let stack = Arc::new(stack);
        let remote = Arc::clone(&stack);

        let result = thread::spawn(move || remote.push_cause(CauseHandle::new(Source("x"))).is_err())
            .join()
            .unwrap();

        assert!(result);
        assert_eq!(stack.cause_len(), 1);
        assert_eq!(metrics.illegal_thread_accesses(), 1);
    }
}
