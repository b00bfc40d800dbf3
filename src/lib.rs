//! causeway - cause tracking, phase-scoped transaction capture and
//! event dispatch for a single-threaded simulation tick
//!
//! - `cause`: the cause stack and immutable cause snapshots
//! - `tracker`: the phase stack and its capture rules
//! - `transaction`: captured transactions and their finalization
//! - `event`: the listener registry and prioritized dispatch
//! - `bridge`: posting one event on two buses
//! - `sim`: a small reference world driving all of the above

pub mod affinity;
pub mod bridge;
pub mod cause;
pub mod cli;
pub mod event;
pub mod observability;
pub mod sim;
pub mod tracker;
pub mod transaction;
pub mod world;
