// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants.
//!
//! Tolerances are (relative, absolute) pairs, used when comparing coordinate
//! and data arrays between flag objects.

/// Tolerance on times \[days\]. About 1 ms.
pub const TIME_TOL: (f64, f64) = (0.0, 1e-8);

/// Tolerance on LSTs \[radians\].
pub const LST_TOL: (f64, f64) = (0.0, 1e-6);

/// Tolerance on frequencies and channel widths \[Hz\].
pub const FREQ_TOL: (f64, f64) = (0.0, 1e-3);

/// Tolerance on metric, weights and weights-square values.
pub const METRIC_TOL: (f64, f64) = (1e-5, 1e-8);

/// Tolerance on antenna positions \[metres\].
pub const ANTPOS_TOL: (f64, f64) = (0.0, 1e-3);

/// Tolerance on telescope locations. The angular part is in radians, the height
/// in metres.
pub const LOCATION_TOL: (f64, f64) = (0.0, 1e-3);

/// Baseline numbers above this value use the 2048-antenna convention.
pub const BASELINE_2048_OFFSET: u64 = 1 << 16;

/// The largest number of antennas that can use the 256-antenna baseline
/// convention.
pub const MAX_ANTS_256_CONVENTION: usize = 255;

lazy_static::lazy_static! {
    /// The provenance tag appended to the history of any object that this
    /// crate modifies, reads or writes.
    pub static ref VERSION_STR: String = format!(
        "Read/written with {} version: {}.",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
}
