//! Stream adapters for progress reporting

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
