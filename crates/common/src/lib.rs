//! Shared types used across the property-management crates.

pub mod clock;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::RecordId;
