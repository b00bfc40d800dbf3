//! Dual-bus bridge
//!
//! Some extensions listen on a second, external event bus. A local event
//! that has an external counterpart is posted through both: the local
//! before tier, then the external bus, then the local after tier, with
//! state synced across at each hand-off.

mod bus;
mod errors;

pub use bus::{DualBusBridge, DualBusEvent, DualPostOutcome, ExternalBus};
pub use errors::{BridgeError, BridgeResult, SyncError};
