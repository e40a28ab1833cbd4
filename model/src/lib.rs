//! Data model shared by the climate node firmware, the host simulator and any
//! collector that wants to recompute severity on its side.
//!
//! Nothing in here touches hardware or the network: readings, error events,
//! the threshold classifier and the wire encoding are all plain values.

mod payload;
mod severity;
mod state;

pub use payload::{ErrorEvent, ErrorStatus, Payload, PayloadKind, Reading, TIMESTAMP_FORMAT};
pub use severity::{Band, QuantityBands, SeverityLabel, Thresholds};
pub use state::{DeliveryOutcome, LinkState};
