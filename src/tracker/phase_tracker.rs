//! Phase Tracker
//!
//! A phase is a scope of simulation work (a block tick, an explosion, a
//! command). While it is on top of the stack, capture calls append to its
//! transaction log. Popping it runs its completion with its cause frame
//! still open, then closes the frame.
//!
//! Phases nest strictly. The guard returned by `push_phase` pops its phase
//! when closed or dropped; popping anything but the top phase is fatal and
//! leaves the stack untouched.
//!
//! All mutation is bound to the thread that built the tracker. Calls from
//! any other thread are rejected by `ThreadAffinity` before a lock is taken.
//! No lock is held while a completion runs.

use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use super::config::TrackerConfig;
use super::context::{apply_frame, finalize, Completion, PhaseBuilder, PhaseContext};
use super::errors::{PhaseError, PhaseId, PhaseResult};
use super::kind::PhaseKind;
use crate::affinity::ThreadAffinity;
use crate::cause::{Cause, CauseHandle, CauseStackManager, GameRoot};
use crate::event::EventManager;
use crate::observability::{panic_message, LogEvent, Logger, PhaseObserver};
use crate::transaction::{
    BlockTransaction, CaptureKind, CapturedTransaction, PhaseOutcome, SlotTransaction, SpawnTransaction,
};
use crate::world::{BlockPos, BlockState, EntitySnapshot, ItemStack, SlotRef};

struct PhaseEntry {
    context: PhaseContext,
    completion: Option<Completion>,
}

/// What a capture call did with its transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Appended to the log of the given phase
    Recorded { phase: PhaseId },
    /// No phase on top accepted it; dropped and counted
    Missed,
}

impl Capture {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Capture::Recorded { .. })
    }
}

/// Owner-thread phase stack
pub struct PhaseTracker {
    config: TrackerConfig,
    affinity: ThreadAffinity,
    causes: CauseStackManager,
    stack: Mutex<Vec<PhaseEntry>>,
    next_phase: AtomicU64,
    missed_reports: AtomicUsize,
}

impl PhaseTracker {
    /// Bind a tracker to the calling thread, rooted at the game
    pub fn new(config: TrackerConfig, observer: Arc<dyn PhaseObserver>) -> Self {
        Self::with_root(config, observer, CauseHandle::new(GameRoot::new("game")))
    }

    /// Bind a tracker to the calling thread with a custom root cause
    pub fn with_root(config: TrackerConfig, observer: Arc<dyn PhaseObserver>, root: CauseHandle) -> Self {
        let affinity = ThreadAffinity::bind_current(observer);
        let mut causes = CauseStackManager::with_root(affinity.clone(), root);
        causes.set_panic_on_fatal(config.panic_on_fatal);
        Self {
            config,
            affinity,
            causes,
            stack: Mutex::new(Vec::new()),
            next_phase: AtomicU64::new(0),
            missed_reports: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The cause stack phases push their frames onto
    pub fn causes(&self) -> &CauseStackManager {
        &self.causes
    }

    pub fn observer(&self) -> &Arc<dyn PhaseObserver> {
        self.affinity.observer()
    }

    pub fn owner_thread(&self) -> ThreadId {
        self.affinity.owner()
    }

    pub fn current_cause(&self) -> PhaseResult<Cause> {
        Ok(self.causes.current_cause()?)
    }

    fn lock(&self) -> PhaseResult<MutexGuard<'_, Vec<PhaseEntry>>> {
        self.stack
            .lock()
            .map_err(|_| PhaseError::Internal("phase stack lock poisoned".into()))
    }

    /// Push a phase configured by `build` and return its guard
    #[track_caller]
    pub fn push_phase<F>(&self, kind: PhaseKind, build: F) -> PhaseResult<PhaseGuard<'_>>
    where
        F: FnOnce(PhaseBuilder) -> PhaseBuilder,
    {
        let location = Location::caller();
        self.affinity.check("push_phase")?;

        let depth = self.depth() + 1;
        if depth > self.config.max_phase_depth {
            let err = PhaseError::RunawayPhase {
                kind,
                depth,
                limit: self.config.max_phase_depth,
            };
            let at = location.to_string();
            self.report_fatal(LogEvent::RunawayPhase, &err, &[("location", &at)]);
            return Err(err);
        }

        let (causes, context, completion) = build(PhaseBuilder::new(kind)).into_parts();
        let frame = self.causes.open_frame()?;
        if let Err(err) = apply_frame(&self.causes, causes, context) {
            self.causes.close_frame(frame)?;
            return Err(err.into());
        }

        let id = PhaseId(self.next_phase.fetch_add(1, Ordering::Relaxed));
        let context = PhaseContext::new(id, kind, frame, depth, location, Arc::clone(self.observer()));
        match self.lock() {
            Ok(mut stack) => stack.push(PhaseEntry { context, completion }),
            Err(err) => {
                self.causes.close_frame(frame)?;
                return Err(err);
            }
        }

        if self.config.verbose {
            let phase = id.to_string();
            let depth = depth.to_string();
            let at = location.to_string();
            Logger::event(
                LogEvent::PhasePush,
                &[
                    ("phase", &phase),
                    ("kind", kind.as_str()),
                    ("depth", &depth),
                    ("location", &at),
                ],
            );
        }

        Ok(PhaseGuard {
            tracker: self,
            id,
            kind,
            closed: false,
        })
    }

    /// Push a phase with no extra causes, context or completion
    #[track_caller]
    pub fn enter(&self, kind: PhaseKind) -> PhaseResult<PhaseGuard<'_>> {
        self.push_phase(kind, |builder| builder)
    }

    /// Pop the phase owned by `guard`
    pub fn pop_phase(&self, guard: PhaseGuard<'_>) -> PhaseResult<()> {
        guard.close()
    }

    pub(crate) fn close_phase(&self, id: PhaseId) -> PhaseResult<()> {
        self.affinity.check("pop_phase")?;

        let entry = {
            let mut stack = self.lock()?;
            let top = stack.last().map(|e| (e.context.id(), e.context.kind()));
            match top {
                None => {
                    drop(stack);
                    let err = PhaseError::Underflow { closing: id };
                    self.report_fatal(LogEvent::PhaseUnderflow, &err, &[]);
                    return Err(err);
                }
                Some((top, top_kind)) if top != id => {
                    drop(stack);
                    let err = PhaseError::Mismatch {
                        closing: id,
                        top,
                        top_kind,
                    };
                    self.report_fatal(LogEvent::PhaseMismatch, &err, &[]);
                    return Err(err);
                }
                Some(_) => stack
                    .pop()
                    .ok_or_else(|| PhaseError::Internal("phase stack emptied while locked".into()))?,
            }
        };

        let PhaseEntry { context, completion } = entry;
        let kind = context.kind();
        let location = context.location();
        let frame = context.frame_id();
        let started = context.started();

        let completed = match completion {
            Some(completion) => self.run_completion(completion, context),
            None => {
                self.report_unfinalized(&context);
                Ok(())
            }
        };

        self.observer()
            .phase_duration(kind, &location.to_string(), started.elapsed());
        if self.config.verbose {
            let phase = id.to_string();
            let at = location.to_string();
            Logger::event(
                LogEvent::PhasePop,
                &[("phase", &phase), ("kind", kind.as_str()), ("location", &at)],
            );
        }

        self.causes.close_frame(frame)?;
        completed
    }

    fn run_completion(&self, completion: Completion, context: PhaseContext) -> PhaseResult<()> {
        let id = context.id();
        let kind = context.kind();
        match panic::catch_unwind(AssertUnwindSafe(|| completion(self, context))) {
            Ok(()) => Ok(()),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                let phase = id.to_string();
                Logger::event(
                    LogEvent::PhaseCompletionFailed,
                    &[("phase", &phase), ("kind", kind.as_str()), ("reason", &reason)],
                );
                Err(PhaseError::CompletionFailed {
                    phase: id,
                    kind,
                    reason,
                })
            }
        }
    }

    fn report_fatal(&self, event: LogEvent, err: &PhaseError, extra: &[(&str, &str)]) {
        self.observer().fatal(err.code());
        let depth = self.depth().to_string();
        let reason = err.to_string();
        let stack = if self.config.verbose {
            self.phase_stack_summary().join(" > ")
        } else {
            String::new()
        };

        let mut fields: Vec<(&str, &str)> = vec![("code", err.code()), ("depth", &depth), ("reason", &reason)];
        if self.config.verbose {
            fields.push(("phase_stack", &stack));
        }
        fields.extend_from_slice(extra);
        Logger::event(event, &fields);
    }

    /// Number of open phases
    pub fn depth(&self) -> usize {
        self.stack.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_idle(&self) -> bool {
        self.depth() == 0
    }

    pub fn current_phase_kind(&self) -> Option<PhaseKind> {
        self.with_current_phase(|context| context.kind())
    }

    /// Run `f` against the top phase. `f` runs under the stack lock and
    /// must not call back into the tracker.
    pub fn with_current_phase<R>(&self, f: impl FnOnce(&PhaseContext) -> R) -> Option<R> {
        let stack = self.stack.lock().ok()?;
        stack.last().map(|entry| f(&entry.context))
    }

    /// `Kind@file:line` for every open phase, outermost first
    pub fn phase_stack_summary(&self) -> Vec<String> {
        match self.stack.lock() {
            Ok(stack) => stack
                .iter()
                .map(|e| format!("{}@{}", e.context.kind(), e.context.location()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn record_block(&self, pos: BlockPos, original: BlockState, replacement: BlockState) -> PhaseResult<Capture> {
        self.capture(CapturedTransaction::Block(BlockTransaction::new(
            pos,
            original,
            replacement,
        )))
    }

    pub fn record_slot(&self, slot: SlotRef, original: ItemStack, replacement: ItemStack) -> PhaseResult<Capture> {
        self.capture(CapturedTransaction::Slot(SlotTransaction::new(
            slot,
            original,
            replacement,
        )))
    }

    pub fn record_entity_spawn(&self, entity: EntitySnapshot) -> PhaseResult<Capture> {
        self.capture(CapturedTransaction::EntitySpawn(SpawnTransaction::spawn(entity)))
    }

    fn capture(&self, transaction: CapturedTransaction) -> PhaseResult<Capture> {
        self.affinity.check("capture")?;
        let kind = transaction.kind();

        let recorded = {
            let mut stack = self.lock()?;
            match stack.last_mut() {
                Some(entry) if entry.context.kind().accepts(kind) => {
                    entry.context.record(transaction);
                    Ok(entry.context.id())
                }
                Some(entry) => Err((Some((entry.context.kind(), entry.context.location())), transaction)),
                None => Err((None, transaction)),
            }
        };

        match recorded {
            Ok(phase) => {
                self.observer().transaction_captured();
                Ok(Capture::Recorded { phase })
            }
            Err((rejected_by, transaction)) => {
                self.report_missed(kind, rejected_by, &transaction);
                Ok(Capture::Missed)
            }
        }
    }

    fn report_missed(
        &self,
        kind: CaptureKind,
        rejected_by: Option<(PhaseKind, &'static Location<'static>)>,
        transaction: &CapturedTransaction,
    ) {
        let description = match rejected_by {
            Some((phase, location)) => format!(
                "{} capture not accepted by {} at {}: {}",
                kind,
                phase,
                location,
                transaction.describe()
            ),
            None => format!("{} capture with no active phase: {}", kind, transaction.describe()),
        };
        let phase = rejected_by.map(|(phase, _)| phase.as_str()).unwrap_or("none");
        self.count_missed(kind, phase, &description);
    }

    /// A phase without a completion never finalizes its log; whatever it
    /// captured is accounted for as missed.
    fn report_unfinalized(&self, context: &PhaseContext) {
        for transaction in context.transactions().iter() {
            let description = format!(
                "{} capture dropped by {} at {} (no completion): {}",
                transaction.kind(),
                context.kind(),
                context.location(),
                transaction.describe()
            );
            self.count_missed(transaction.kind(), context.kind().as_str(), &description);
        }
    }

    fn count_missed(&self, kind: CaptureKind, phase: &str, description: &str) {
        self.observer().missed_capture(description);

        let reported = self.missed_reports.fetch_add(1, Ordering::Relaxed);
        if reported < self.config.max_missed_capture_reports {
            Logger::event(
                LogEvent::CaptureMissed,
                &[("kind", kind.as_str()), ("phase", phase), ("description", description)],
            );
        }
    }

    /// Standard completion: drain the log, post its events through `events`
    pub fn post_captured(events: Arc<EventManager>) -> impl FnOnce(&PhaseTracker, PhaseContext) + Send + 'static {
        Self::post_captured_then(events, |_, _| {})
    }

    /// Standard completion that hands the outcome to `then`, typically to
    /// restore rejected transactions
    pub fn post_captured_then<F>(
        events: Arc<EventManager>,
        then: F,
    ) -> impl FnOnce(&PhaseTracker, PhaseContext) + Send + 'static
    where
        F: FnOnce(&PhaseTracker, PhaseOutcome) + Send + 'static,
    {
        move |tracker: &PhaseTracker, mut context: PhaseContext| {
            if let Some(outcome) = finalize(tracker, &events, &mut context) {
                then(tracker, outcome);
            }
        }
    }
}

/// Scoped phase.
///
/// Closing or dropping the guard pops the phase. Guards must be released in
/// reverse push order; dropping one out of order is fatal and panics unless
/// the thread is already unwinding or `panic_on_fatal` is off.
#[must_use = "dropping the guard pops the phase immediately"]
pub struct PhaseGuard<'a> {
    tracker: &'a PhaseTracker,
    id: PhaseId,
    kind: PhaseKind,
    closed: bool,
}

impl PhaseGuard<'_> {
    pub fn id(&self) -> PhaseId {
        self.id
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    /// Pop the phase, running its completion.
    ///
    /// A fatal error (underflow, mismatch) consumes the guard but leaves its
    /// entry on the stack; the tracker cannot be trusted afterwards.
    pub fn close(mut self) -> PhaseResult<()> {
        self.closed = true;
        self.tracker.close_phase(self.id)
    }
}

impl fmt::Debug for PhaseGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseGuard")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.tracker.close_phase(self.id) {
            if err.is_fatal() && self.tracker.config.panic_on_fatal && !thread::panicking() {
                panic!("phase discipline violated: {}", err);
            }
        }
    }
}
