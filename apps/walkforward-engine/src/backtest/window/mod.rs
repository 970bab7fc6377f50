//! Window generation for walk-forward analysis.
//!
//! Partitions a price table into ordered (train, test) row ranges:
//! - Rolling: the train window keeps a fixed width and slides forward
//! - Expanding: the train window always starts at row 0 and grows
//!
//! With `step == test_size` consecutive test ranges are contiguous and
//! non-overlapping. A trailing window that would run past the end of the
//! table is never produced.

mod generator;
mod types;

pub use generator::{WindowGenerator, Windows, generate_windows};
pub use types::{Window, WindowMode, WindowSpec};
