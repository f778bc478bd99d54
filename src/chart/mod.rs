//! Chart document construction.
//!
//! - [`transform`]: rows + measurement metadata -> [`ChartDocument`](plcwatch_types::ChartDocument)
//! - [`palette`]: colours for newly discovered variables

pub mod palette;
pub mod transform;

pub use palette::{color_for, PALETTE};
pub use transform::{transform, UnknownMeasurementPolicy, FALLBACK_RANGE};
