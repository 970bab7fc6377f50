//! Lazy, restartable window generation.

use std::iter::FusedIterator;

use tracing::{debug, warn};

use super::types::{Window, WindowMode, WindowSpec};
use crate::data::PriceTable;
use crate::error::EngineError;

/// Generates the ordered sequence of windows over a table of `rows` rows.
///
/// Window `i` is computed directly from `i`; the generator keeps no state
/// between windows, so `iter()` can be called any number of times and always
/// yields the same sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGenerator {
    spec: WindowSpec,
    rows: usize,
    count: usize,
}

impl WindowGenerator {
    /// Create a generator for a table with `rows` rows.
    ///
    /// Fails with `InsufficientData` when the table cannot hold one complete
    /// train + test window, and with `Configuration` for zero sizes or a step
    /// that would leave gaps or overlaps between test windows.
    pub fn new(rows: usize, spec: WindowSpec) -> Result<Self, EngineError> {
        if spec.train_size == 0 || spec.test_size == 0 || spec.step == 0 {
            return Err(EngineError::Configuration(format!(
                "train_size ({}), test_size ({}) and step ({}) must all be positive",
                spec.train_size, spec.test_size, spec.step
            )));
        }

        // Test windows must tile the evaluation rows exactly once.
        if spec.step != spec.test_size {
            return Err(EngineError::Configuration(format!(
                "step ({}) must equal test_size ({})",
                spec.step, spec.test_size
            )));
        }

        let required = spec.min_rows();
        if rows < required {
            warn!(
                rows = rows,
                required = required,
                "Insufficient data for walk-forward analysis"
            );
            return Err(EngineError::InsufficientData {
                rows,
                required,
                train_size: spec.train_size,
                test_size: spec.test_size,
            });
        }

        let count = (rows - required) / spec.step + 1;

        debug!(
            windows = count,
            mode = %spec.mode,
            train_size = spec.train_size,
            test_size = spec.test_size,
            step = spec.step,
            "Generated walk-forward windows"
        );

        Ok(Self { spec, rows, count })
    }

    /// Create a generator sized to a price table.
    pub fn for_table(table: &PriceTable, spec: WindowSpec) -> Result<Self, EngineError> {
        Self::new(table.len(), spec)
    }

    /// Partitioning parameters.
    #[must_use]
    pub const fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    /// Number of rows in the partitioned table.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of complete windows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Always false: construction fails instead of producing zero windows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Compute window `index`, or `None` past the last complete window.
    #[must_use]
    pub fn window(&self, index: usize) -> Option<Window> {
        if index >= self.count {
            return None;
        }

        let test_start = index
            .checked_mul(self.spec.step)?
            .checked_add(self.spec.train_size)?;
        let test_end = test_start.checked_add(self.spec.test_size)?;
        let train_start = match self.spec.mode {
            WindowMode::Rolling => test_start - self.spec.train_size,
            WindowMode::Expanding => 0,
        };

        Some(Window {
            index,
            train: train_start..test_start,
            test: test_start..test_end,
        })
    }

    /// Iterate windows in order.
    #[must_use]
    pub const fn iter(&self) -> Windows {
        Windows {
            generator: *self,
            next: 0,
        }
    }
}

impl IntoIterator for &WindowGenerator {
    type Item = Window;
    type IntoIter = Windows;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over generated windows.
#[derive(Debug, Clone)]
pub struct Windows {
    generator: WindowGenerator,
    next: usize,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Self::Item> {
        let window = self.generator.window(self.next)?;
        self.next += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.generator.count.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows {}

impl FusedIterator for Windows {}

/// Generate all windows for a price table.
pub fn generate_windows(table: &PriceTable, spec: WindowSpec) -> Result<Vec<Window>, EngineError> {
    Ok(WindowGenerator::for_table(table, spec)?.iter().collect())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_generate_windows_rolling() {
        let generator = WindowGenerator::new(252, WindowSpec::new(WindowMode::Rolling, 60, 20)).unwrap();
        let windows: Vec<Window> = generator.iter().collect();

        assert_eq!(windows.len(), 9);
        for (i, window) in windows.iter().enumerate() {
            assert_eq!(window.index, i);
            assert_eq!(window.train_len(), 60);
            assert_eq!(window.test_len(), 20);
            assert_eq!(window.train.end, window.test.start);
        }
        assert_eq!(windows[0].train, 0..60);
        assert_eq!(windows[0].test, 60..80);
        assert_eq!(windows[8].test, 220..240);
    }

    #[test]
    fn test_generate_windows_expanding() {
        let generator =
            WindowGenerator::new(20, WindowSpec::new(WindowMode::Expanding, 10, 1)).unwrap();
        let windows: Vec<Window> = generator.iter().collect();

        assert_eq!(windows.len(), 10);
        assert!(windows.iter().all(|w| w.train.start == 0));
        assert_eq!(windows[0].train_len(), 10);
        assert_eq!(windows[1].train_len(), 11);
        assert_eq!(windows[9].test, 19..20);
    }

    #[test]
    fn test_insufficient_data() {
        let result = WindowGenerator::new(79, WindowSpec::new(WindowMode::Rolling, 60, 20));
        let Err(EngineError::InsufficientData { rows, required, .. }) = result else {
            panic!("short table should be rejected");
        };
        assert_eq!(rows, 79);
        assert_eq!(required, 80);
    }

    #[test]
    fn test_exactly_one_window() {
        let generator = WindowGenerator::new(80, WindowSpec::new(WindowMode::Rolling, 60, 20)).unwrap();
        assert_eq!(generator.len(), 1);
        assert!(generator.window(1).is_none());
    }

    #[test]
    fn test_trailing_partial_window_omitted() {
        // 12 rows: train 6, test 4 -> second test window would need rows 10..14.
        let generator = WindowGenerator::new(12, WindowSpec::new(WindowMode::Rolling, 6, 4)).unwrap();
        let windows: Vec<Window> = generator.iter().collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].test, 6..10);
    }

    #[test_case(0, 5, 5 ; "zero train")]
    #[test_case(5, 0, 5 ; "zero test")]
    #[test_case(5, 5, 0 ; "zero step")]
    fn test_zero_sizes_rejected(train: usize, test: usize, step: usize) {
        let spec = WindowSpec::new(WindowMode::Rolling, train, test).with_step(step);
        assert!(matches!(
            WindowGenerator::new(100, spec),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test_case(5, 2, 3 ; "gaps between tests")]
    #[test_case(5, 4, 2 ; "overlapping tests")]
    fn test_step_must_equal_test_size(train: usize, test: usize, step: usize) {
        let spec = WindowSpec::new(WindowMode::Rolling, train, test).with_step(step);
        let Err(EngineError::Configuration(message)) = WindowGenerator::new(100, spec) else {
            panic!("step {step} with test_size {test} should be rejected");
        };
        assert!(message.contains("step"));
    }

    #[test_case(usize::MAX, 20 ; "huge train")]
    #[test_case(60, usize::MAX ; "huge test")]
    #[test_case(usize::MAX, usize::MAX ; "both huge")]
    fn test_huge_sizes_are_insufficient_data(train: usize, test: usize) {
        let result = WindowGenerator::new(100, WindowSpec::new(WindowMode::Rolling, train, test));
        let Err(EngineError::InsufficientData { rows, required, .. }) = result else {
            panic!("oversized window should be insufficient data");
        };
        assert_eq!(rows, 100);
        assert_eq!(required, usize::MAX);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let generator = WindowGenerator::new(100, WindowSpec::new(WindowMode::Rolling, 30, 10)).unwrap();
        let first: Vec<Window> = generator.iter().collect();
        let second: Vec<Window> = (&generator).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(generator.iter().len(), first.len());
    }

    #[test]
    fn test_test_ranges_contiguous() {
        let generator =
            WindowGenerator::new(500, WindowSpec::new(WindowMode::Expanding, 100, 25)).unwrap();
        let windows: Vec<Window> = generator.iter().collect();
        for pair in windows.windows(2) {
            assert_eq!(pair[0].test.end, pair[1].test.start);
        }
    }
}
