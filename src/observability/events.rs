//! Log event names
//!
//! Every line the crate logs names one of these events. Names are stable
//! so log scrapers can key on them.

use std::fmt;

use super::logger::Severity;

/// Observable events emitted by the cause stack, tracker and event buses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    // Phase lifecycle
    /// Phase pushed onto the stack (verbose only)
    PhasePush,
    /// Phase popped and completed (verbose only)
    PhasePop,
    /// Phase completion callback panicked
    PhaseCompletionFailed,
    /// Phase stack grew past the configured depth
    RunawayPhase,

    // Stack discipline (FATAL)
    /// Pop requested on an empty phase stack
    PhaseUnderflow,
    /// Phase guard closed while another phase was on top
    PhaseMismatch,
    /// Cause frame closed out of order
    FrameMismatch,
    /// Transaction log drained twice
    DoubleDrain,

    // Capture
    /// Capture attempted with no eligible phase
    CaptureMissed,

    // Thread affinity
    /// Mutation attempted from a thread other than the owner
    IllegalThreadAccess,

    // Event dispatch
    /// Listener returned an error or panicked
    ListenerFailed,
    /// Listener registered
    ListenerRegistered,
    /// All listeners of an owner removed
    ListenersUnregistered,

    // Dual bus
    /// External state could not be synced back into the local event
    DualSyncFailed,

    // Host
    /// Reference world started a tick
    SimulationTick,
    /// Configuration loaded
    ConfigLoaded,
}

impl LogEvent {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEvent::PhasePush => "PHASE_PUSH",
            LogEvent::PhasePop => "PHASE_POP",
            LogEvent::PhaseCompletionFailed => "PHASE_COMPLETION_FAILED",
            LogEvent::RunawayPhase => "PHASE_RUNAWAY",
            LogEvent::PhaseUnderflow => "PHASE_UNDERFLOW",
            LogEvent::PhaseMismatch => "PHASE_MISMATCH",
            LogEvent::FrameMismatch => "FRAME_MISMATCH",
            LogEvent::DoubleDrain => "TRANSACTION_LOG_DOUBLE_DRAIN",
            LogEvent::CaptureMissed => "CAPTURE_MISSED",
            LogEvent::IllegalThreadAccess => "ILLEGAL_THREAD_ACCESS",
            LogEvent::ListenerFailed => "LISTENER_FAILED",
            LogEvent::ListenerRegistered => "LISTENER_REGISTERED",
            LogEvent::ListenersUnregistered => "LISTENERS_UNREGISTERED",
            LogEvent::DualSyncFailed => "DUAL_SYNC_FAILED",
            LogEvent::SimulationTick => "SIMULATION_TICK",
            LogEvent::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Returns true if this event means the stack invariants are broken
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LogEvent::PhaseUnderflow
                | LogEvent::PhaseMismatch
                | LogEvent::FrameMismatch
                | LogEvent::DoubleDrain
                | LogEvent::RunawayPhase
        )
    }

    /// Default severity for this event
    pub fn severity(&self) -> Severity {
        if self.is_fatal() {
            return Severity::Fatal;
        }
        match self {
            LogEvent::PhasePush | LogEvent::PhasePop => Severity::Trace,
            LogEvent::CaptureMissed => Severity::Warn,
            LogEvent::IllegalThreadAccess
            | LogEvent::ListenerFailed
            | LogEvent::DualSyncFailed
            | LogEvent::PhaseCompletionFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
