//! Translating a variable selection and time window into a store query.
//!
//! ## Submodules
//!
//! - [`window`]: resolving historical, relative and live requests into a [`TimeWindow`]
//! - [`bucket`]: deriving the aggregation [`BucketWidth`] for a window
//! - [`flux`]: building the parameterised [`FluxQuery`] sent to the store
//!
//! ## Data Flow
//!
//! ```text
//! HistoricalRange | "-10m" | live
//!        │
//!        ▼
//! TimeWindow { start, stop, bucket }
//!        │
//!        ▼
//! QueryBuilder::chart(variables, window) ──▶ FluxQuery { text, params }
//! ```

pub mod bucket;
pub mod flux;
pub mod window;

pub use bucket::{BucketUnit, BucketWidth};
pub use flux::{flux_string, FluxQuery, QueryBuilder};
pub use window::{HistoricalRange, OffsetUnit, RelativeOffset, TimeWindow};
