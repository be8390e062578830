//! Interval-to-index lookups on sorted position arrays.
//!
//! The same lookup serves both traces: it finds the theoretical line under a
//! selection on the line list, and the experimental samples under a selection
//! on the measured spectrum.

use std::ops::Range;

use crate::error::AssignError;

/// Indices of the first and last positions inside `[xmin, xmax]` (inclusive).
///
/// `positions` must be sorted ascending. When several positions fall inside
/// the interval, callers doing single-line lookups use `first`: a selection is
/// expected to bracket one line and the lowest-position match wins.
///
/// Fails with [`AssignError::EmptySelection`] when nothing lies in range, so a
/// returned index is always valid for `positions`.
pub fn bounding_indices(positions: &[f64], xmin: f64, xmax: f64) -> Result<(usize, usize), AssignError> {
    let range = index_range(positions, xmin, xmax)?;
    Ok((range.start, range.end - 1))
}

/// Half-open index range of the positions inside `[xmin, xmax]`; never empty.
pub fn index_range(positions: &[f64], xmin: f64, xmax: f64) -> Result<Range<usize>, AssignError> {
    let start = positions.partition_point(|&p| p < xmin);
    let end = positions.partition_point(|&p| p <= xmax);
    if start >= end {
        return Err(AssignError::EmptySelection { xmin, xmax });
    }
    Ok(start..end)
}

/// Index of the position closest to `x` (ties go to the lower index).
///
/// Used by the terminal front-end to snap its cursor; returns `None` for an
/// empty array.
pub fn nearest_index(positions: &[f64], x: f64) -> Option<usize> {
    if positions.is_empty() {
        return None;
    }
    let upper = positions.partition_point(|&p| p < x);
    if upper == 0 {
        return Some(0);
    }
    if upper == positions.len() {
        return Some(positions.len() - 1);
    }
    let below = upper - 1;
    if (x - positions[below]).abs() <= (positions[upper] - x).abs() {
        Some(below)
    } else {
        Some(upper)
    }
}
