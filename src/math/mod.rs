// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.


use ndarray::prelude::*;

use crate::constants::{BASELINE_2048_OFFSET, MAX_ANTS_256_CONVENTION};

/// Convert a pair of antenna numbers into a baseline number. If the telescope
/// has more than 255 antennas, the 2048-antenna convention is used.
pub fn antnums_to_baseline(ant1: u32, ant2: u32, num_telescope_ants: usize) -> u64 {
    let (ant1, ant2) = (u64::from(ant1), u64::from(ant2));
    if num_telescope_ants > MAX_ANTS_256_CONVENTION || ant1 > 254 || ant2 > 254 {
        2048 * (ant1 + 1) + (ant2 + 1) + BASELINE_2048_OFFSET
    } else {
        256 * (ant1 + 1) + (ant2 + 1)
    }
}

/// Convert a baseline number into a pair of antenna numbers. Both the 256 and
/// 2048 antenna conventions are understood.
pub fn baseline_to_antnums(baseline: u64) -> (u32, u32) {
    let (ant1, ant2) = if baseline > BASELINE_2048_OFFSET {
        let bl = baseline - BASELINE_2048_OFFSET;
        let ant2 = (bl % 2048).saturating_sub(1);
        let ant1 = ((bl - (ant2 + 1)) / 2048).saturating_sub(1);
        (ant1, ant2)
    } else {
        let ant2 = (baseline % 256).saturating_sub(1);
        let ant1 = ((baseline - (ant2 + 1)) / 256).saturating_sub(1);
        (ant1, ant2)
    };
    (ant1 as u32, ant2 as u32)
}

/// Given a 2D boolean array, return an array where an element is true only if
/// its whole row or whole column is true.
pub fn and_rows_cols(mask: ArrayView2<bool>) -> Array2<bool> {
    let mut out = Array2::from_elem(mask.dim(), false);
    for (i_row, row) in mask.outer_iter().enumerate() {
        if row.iter().all(|&f| f) {
            out.row_mut(i_row).fill(true);
        }
    }
    for (i_col, col) in mask.axis_iter(Axis(1)).enumerate() {
        if col.iter().all(|&f| f) {
            out.column_mut(i_col).fill(true);
        }
    }
    out
}

/// Are two floats equal within a relative and absolute tolerance? This is the
/// same test as numpy's `isclose`.
pub(crate) fn is_close(a: f64, b: f64, (rtol, atol): (f64, f64)) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= atol + rtol * b.abs()
}

/// Are all of the floats in two slices equal within a tolerance? Slices of
/// different lengths are never close.
pub(crate) fn all_close(a: &[f64], b: &[f64], tol: (f64, f64)) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&a, &b)| is_close(a, b, tol))
}

/// The same as [`all_close`], but for arrays. Arrays of different shapes are
/// never close.
pub(crate) fn arrays_close<D: Dimension>(
    a: ArrayView<f64, D>,
    b: ArrayView<f64, D>,
    tol: (f64, f64),
) -> bool {
    a.shape() == b.shape() && a.iter().zip(b.iter()).all(|(&a, &b)| is_close(a, b, tol))
}

/// Get the sorted, unique values of a float slice.
pub(crate) fn unique_f64(values: &[f64]) -> Vec<f64> {
    let mut unique = values.to_vec();
    unique.sort_unstable_by(|a, b| a.total_cmp(b));
    unique.dedup();
    unique
}

/// Find the index of a float in a slice, within a tolerance.
pub(crate) fn find_close(values: &[f64], target: f64, tol: (f64, f64)) -> Option<usize> {
    values.iter().position(|&v| is_close(v, target, tol))
}
