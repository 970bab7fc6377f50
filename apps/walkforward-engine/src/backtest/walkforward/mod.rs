//! Walk-forward orchestration.
//!
//! Ties the window generator, strategy adapter and portfolio simulator
//! together:
//! - Windows run strictly in order, each starting from the previous
//!   window's terminal capital
//! - Per-window errors follow `on_window_error` (skip or abort)
//! - Segments are stitched into one out-of-sample curve and scored
//! - Cancellation is checked between windows

mod builder;
mod cancel;
mod engine;
mod types;

pub use builder::WalkForwardBuilder;
pub use cancel::CancellationToken;
pub use engine::{FALLBACK_PERIODS_PER_YEAR, WalkForwardEngine};
pub use types::{
    EngineState, WalkForwardResult, WindowDiagnostics, WindowFailure, WindowStatus,
};
