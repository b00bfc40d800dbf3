//! Phase tracking
//!
//! `PhaseTracker` keeps a stack of phases, each owning a cause frame and a
//! transaction log. Capture calls land in the top phase when its kind is
//! interested; popping a phase runs its completion, usually finalization
//! into events.

mod config;
mod context;
mod errors;
mod kind;
mod phase_tracker;

pub use config::{TrackerConfig, MAX_PHASE_DEPTH_LIMIT};
pub use context::{PhaseBuilder, PhaseContext};
pub use errors::{ConfigError, ConfigResult, PhaseError, PhaseId, PhaseResult};
pub use kind::{CaptureInterests, PhaseKind};
pub use phase_tracker::{Capture, PhaseGuard, PhaseTracker};
