//! # Cause Stack
//!
//! Tracks why the tick thread is doing what it is doing.
//!
//! ## Invariants
//!
//! - Frames close in strict LIFO order; violations are fatal
//! - Closing a frame restores the cause sequence and context exactly
//! - Snapshots (`Cause`) never alias the live stack
//! - Only the owner thread mutates the stack

mod context;
mod errors;
mod object;
mod snapshot;
mod stack;

pub use context::{keys, Context, ContextKey};
pub use errors::{CauseError, CauseResult, FrameId};
pub use object::{AsAny, Causal, CauseHandle, GameRoot};
pub use snapshot::Cause;
pub use stack::{CauseStackFrame, CauseStackManager};
