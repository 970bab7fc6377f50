//! Constants for performance metric calculations.

/// Standard deviations below this are treated as zero.
pub const ZERO_TOLERANCE: f64 = 1e-12;

/// Percent scale.
pub const HUNDRED: f64 = 100.0;
