//! Live chart updates.

pub mod scheduler;

pub use scheduler::{LiveScheduler, LiveUpdate};
