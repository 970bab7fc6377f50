//! Price data consumed by the engine.
//!
//! The engine does not fetch or clean data. It accepts a [`PriceTable`] that
//! the caller has already cleaned and checks the structural preconditions
//! when the table is built.

mod slice;
mod table;

pub use slice::PriceSlice;
pub use table::{PriceRow, PriceTable, TRADING_DAYS_PER_YEAR};
