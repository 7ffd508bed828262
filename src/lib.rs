// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Flag and metric annotations for Murchison Widefield Array (MWA) radio telescope
data.

A [`FlagSet`] holds either continuous metrics (with weights) or boolean flags
for visibilities (baseline type), calibration solutions (antenna type) or a
time-frequency "waterfall". These can be converted between each other, added
together along any axis, downselected and persisted to FITS files.
 */

pub mod constants;
pub mod flags;
pub mod history;
pub mod io;
pub mod lst;
pub(crate) mod math;
pub mod polarisation;
pub mod reference;
pub mod telescope;

mod cli;

#[cfg(test)]
mod tests;

// Re-exports.
pub use cli::{Hyperflag, HyperflagError};
pub use flags::{
    flags_to_waterfall, BaselineSelection, CollapseMethod, FlagAxis, FlagData,
    FlagError, FlagMode, FlagSet, FlagSetOptions, FlagType, PolSelection, SelectCriteria, Values,
};
pub use history::History;
pub use io::{FlagReadError, FlagWriteError};
pub use lst::LstTask;
pub use math::{and_rows_cols, antnums_to_baseline, baseline_to_antnums};
pub use polarisation::Polarizations;
pub use reference::{CalibrationData, Reference, VisibilityData};
pub use telescope::{Telescope, TelescopeError};

// External re-exports.
pub use marlu::{LatLngHeight, XyzGeodetic};
pub use ndarray;
pub use vec1;
