//! Phase contexts and the builder that configures them

use std::any::Any;
use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::errors::{PhaseError, PhaseId, PhaseResult};
use super::kind::PhaseKind;
use super::phase_tracker::PhaseTracker;
use crate::cause::{Causal, CauseHandle, CauseResult, CauseStackManager, ContextKey, FrameId};
use crate::event::EventManager;
use crate::observability::{LogEvent, Logger, PhaseObserver};
use crate::transaction::{post_drained, CapturedTransaction, DrainedTransactions, PhaseOutcome, TransactionLog};

/// Runs once when the phase is popped, with the phase's cause frame still
/// open. Owns the context, so draining is up to it.
pub(crate) type Completion = Box<dyn FnOnce(&PhaseTracker, PhaseContext) + Send>;

type ContextWriter = Box<dyn FnOnce(&CauseStackManager) -> CauseResult<()>>;

/// Everything one pushed phase owns
pub struct PhaseContext {
    id: PhaseId,
    kind: PhaseKind,
    frame: FrameId,
    depth: usize,
    location: &'static Location<'static>,
    started: Instant,
    log: TransactionLog,
    observer: Arc<dyn PhaseObserver>,
}

impl PhaseContext {
    pub(crate) fn new(
        id: PhaseId,
        kind: PhaseKind,
        frame: FrameId,
        depth: usize,
        location: &'static Location<'static>,
        observer: Arc<dyn PhaseObserver>,
    ) -> Self {
        Self {
            id,
            kind,
            frame,
            depth,
            location,
            started: Instant::now(),
            log: TransactionLog::new(),
            observer,
        }
    }

    pub fn id(&self) -> PhaseId {
        self.id
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame
    }

    /// 1 for the outermost phase
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Where the phase was pushed
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub(crate) fn started(&self) -> Instant {
        self.started
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn transactions(&self) -> &TransactionLog {
        &self.log
    }

    pub(crate) fn record(&mut self, transaction: CapturedTransaction) {
        self.log.push(transaction);
    }

    /// Drain the transaction log. Only the first call succeeds; a second
    /// one is reported as fatal.
    pub fn drain(&mut self) -> PhaseResult<DrainedTransactions> {
        match self.log.drain() {
            Ok(drained) => Ok(drained),
            Err(err) => {
                let err = PhaseError::from(err);
                self.observer.fatal(err.code());
                let phase = self.id.to_string();
                let location = self.location.to_string();
                let reason = err.to_string();
                Logger::event(
                    LogEvent::DoubleDrain,
                    &[
                        ("code", err.code()),
                        ("phase", &phase),
                        ("kind", self.kind.as_str()),
                        ("location", &location),
                        ("reason", &reason),
                    ],
                );
                Err(err)
            }
        }
    }
}

/// Configures a phase before it is pushed
pub struct PhaseBuilder {
    kind: PhaseKind,
    causes: Vec<CauseHandle>,
    context: Vec<ContextWriter>,
    completion: Option<Completion>,
}

impl PhaseBuilder {
    pub(crate) fn new(kind: PhaseKind) -> Self {
        Self {
            kind,
            causes: Vec::new(),
            context: Vec::new(),
            completion: None,
        }
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    /// Push `handle` onto the phase's cause frame
    pub fn cause(mut self, handle: CauseHandle) -> Self {
        self.causes.push(handle);
        self
    }

    pub fn cause_of<T: Causal>(self, value: T) -> Self {
        self.cause(CauseHandle::new(value))
    }

    /// Set a context entry inside the phase's cause frame
    pub fn context<T: Any + Send + Sync>(mut self, key: ContextKey<T>, value: T) -> Self {
        self.context
            .push(Box::new(move |stack: &CauseStackManager| stack.add_context(&key, value)));
        self
    }

    /// Replace the completion
    pub fn on_complete<F>(mut self, completion: F) -> Self
    where
        F: FnOnce(&PhaseTracker, PhaseContext) + Send + 'static,
    {
        self.completion = Some(Box::new(completion));
        self
    }

    /// Finalize captures through `events` when the phase pops
    pub fn post_to(self, events: Arc<EventManager>) -> Self {
        self.on_complete(PhaseTracker::post_captured(events))
    }

    /// Like `post_to`, then hand the outcome to `then`
    pub fn post_to_then<F>(self, events: Arc<EventManager>, then: F) -> Self
    where
        F: FnOnce(&PhaseTracker, PhaseOutcome) + Send + 'static,
    {
        self.on_complete(PhaseTracker::post_captured_then(events, then))
    }

    pub(crate) fn into_parts(self) -> (Vec<CauseHandle>, Vec<ContextWriter>, Option<Completion>) {
        (self.causes, self.context, self.completion)
    }
}

pub(crate) fn apply_frame(
    stack: &CauseStackManager,
    causes: Vec<CauseHandle>,
    context: Vec<ContextWriter>,
) -> CauseResult<()> {
    for cause in causes {
        stack.push_cause(cause)?;
    }
    for write in context {
        write(stack)?;
    }
    Ok(())
}

pub(crate) fn finalize(
    tracker: &PhaseTracker,
    events: &EventManager,
    context: &mut PhaseContext,
) -> Option<PhaseOutcome> {
    let drained = context.drain().ok()?;
    match tracker.current_cause() {
        Ok(cause) => Some(post_drained(events, &cause, drained)),
        Err(err) => {
            let phase = context.id().to_string();
            let reason = err.to_string();
            Logger::event(
                LogEvent::PhaseCompletionFailed,
                &[("code", err.code()), ("phase", &phase), ("reason", &reason)],
            );
            None
        }
    }
}
