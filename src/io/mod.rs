// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff: reading and writing flag files, and globbing input paths.
//!
//! Flag objects are stored in FITS files. The primary HDU's header has the
//! type, mode, size counters and telescope identity; every array is in its
//! own named table or image HDU (`TIMES`, `FREQS`, `SPWS`, `POLS`,
//! `BASELINES` or `ANTS`, `TELANTS`, `HISTORY`, `EXTRAKEYS`, then `METRIC`,
//! `WEIGHTS` and `WEIGHTSSQ`, or `FLAGS`).

mod error;
mod fits;
mod glob;
mod read;
mod write;
#[cfg(test)]
mod tests;

pub use error::{FlagReadError, FlagWriteError};
pub use fits::FitsError;
pub use glob::{expand_inputs, GlobError};
