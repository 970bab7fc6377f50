//! Strategy adapter: the calling contract around allocation functions.
//!
//! Any [`AllocationStrategy`] (including plain closures) can be evaluated.
//! The adapter treats it as untrusted: it only ever sees a bounded history
//! view, and its output is validated before the simulator uses it.

mod adapter;
mod builtin;
mod weights;

pub use adapter::{Allocation, AllocationRequest, AllocationStrategy, StrategyAdapter, StrategyError};
pub use builtin::{EqualWeight, InverseVolatility};
pub use weights::{WeightError, WeightVector};
