// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Flag objects.
//!
//! A [`FlagSet`] holds quality information on either visibilities (indexed by
//! baseline-time), calibration solutions (indexed by antenna) or a "waterfall"
//! (indexed only by time, frequency and polarisation). The information is
//! either a metric with weights, or boolean flags. Which of the six
//! combinations an object is in is determined entirely by its [`FlagData`]
//! variant.

mod add;
mod check;
mod combine;
mod convert;
mod error;
mod expand;
mod select;
mod values;

pub use error::FlagError;
pub use select::{BaselineSelection, PolSelection, SelectCriteria};
pub use values::Values;

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, warn};
use ndarray::{prelude::*, Zip};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    constants::{FREQ_TOL, LST_TOL, TIME_TOL},
    history::History,
    math::{all_close, find_close, unique_f64},
    polarisation::Polarizations,
    reference::{CalibrationData, Reference, VisibilityData},
    telescope::Telescope,
};

/// What a flag object's rows are indexed by.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FlagType {
    Baseline,
    Antenna,
    Waterfall,
}

/// Whether a flag object holds metrics or flags.
#[derive(
    Debug, Display, Default, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FlagMode {
    #[default]
    Metric,
    Flag,
}

impl FlagMode {
    /// Parse a mode from user input.
    pub fn from_input(s: &str) -> Result<FlagMode, FlagError> {
        s.parse().map_err(|_| FlagError::BadInputMode)
    }

    /// Parse a mode from somewhere other than user input (e.g. a file).
    pub fn parse_known(s: &str) -> Result<FlagMode, FlagError> {
        s.parse().map_err(|_| FlagError::UnknownMode(s.to_string()))
    }
}

/// An axis that flag objects can be combined along.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum FlagAxis {
    #[strum(to_string = "time")]
    Time,
    #[strum(to_string = "baseline", serialize = "blt")]
    Baseline,
    #[strum(to_string = "antenna", serialize = "ant")]
    Antenna,
    #[strum(to_string = "frequency", serialize = "freq")]
    Frequency,
    #[strum(to_string = "polarization", serialize = "pol", serialize = "jones")]
    Polarization,
}

impl FlagAxis {
    pub fn from_input(s: &str) -> Result<FlagAxis, FlagError> {
        s.parse().map_err(|_| FlagError::UnknownAxis(s.to_string()))
    }
}

/// How to collapse data along an axis.
#[derive(
    Debug, Display, Default, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum CollapseMethod {
    #[strum(to_string = "mean")]
    Mean,
    #[strum(to_string = "absmean", serialize = "absolute")]
    AbsMean,
    #[default]
    #[strum(to_string = "quadmean")]
    QuadMean,
    #[strum(to_string = "or")]
    Or,
    #[strum(to_string = "and")]
    And,
}

impl CollapseMethod {
    pub fn from_input(s: &str) -> Result<CollapseMethod, FlagError> {
        s.parse().map_err(|_| FlagError::UnknownMethod(s.to_string()))
    }

    /// Does this method work on flags without converting them to metrics?
    pub fn is_logical(self) -> bool {
        matches!(self, CollapseMethod::Or | CollapseMethod::And)
    }
}

/// The data of a flag object, along with the arrays identifying its rows.
#[derive(Debug, Clone)]
pub enum FlagData {
    /// Shape (Nblts, Nfreqs, Npols).
    Baseline {
        ant_1_array: Vec<u32>,
        ant_2_array: Vec<u32>,
        baseline_array: Vec<u64>,
        values: Values<Ix3>,
    },
    /// Shape (Nants_data, Nfreqs, Ntimes, Npols).
    Antenna {
        ant_array: Vec<u32>,
        values: Values<Ix4>,
    },
    /// Shape (Ntimes, Nfreqs, Npols).
    Waterfall { values: Values<Ix3> },
}

impl Default for FlagData {
    fn default() -> Self {
        FlagData::Waterfall {
            values: Values::new_metric((0, 0, 0)),
        }
    }
}

impl FlagData {
    pub fn flag_type(&self) -> FlagType {
        match self {
            FlagData::Baseline { .. } => FlagType::Baseline,
            FlagData::Antenna { .. } => FlagType::Antenna,
            FlagData::Waterfall { .. } => FlagType::Waterfall,
        }
    }

    pub fn mode(&self) -> FlagMode {
        match self {
            FlagData::Baseline { values, .. } | FlagData::Waterfall { values } => values.mode(),
            FlagData::Antenna { values, .. } => values.mode(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            FlagData::Baseline { values, .. } | FlagData::Waterfall { values } => values.shape(),
            FlagData::Antenna { values, .. } => values.shape(),
        }
    }

    pub(crate) fn has_weights_square(&self) -> bool {
        match self {
            FlagData::Baseline { values, .. } | FlagData::Waterfall { values } => {
                values.has_weights_square()
            }
            FlagData::Antenna { values, .. } => values.has_weights_square(),
        }
    }
}

/// Quality information on visibilities, calibration solutions or waterfalls.
///
/// Most fields are public, so a flag object can be assembled by hand; use
/// [`FlagSet::check`] afterwards to verify that it is self-consistent.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    pub data: FlagData,

    /// Julian dates (UTC). For baseline-type objects there is one per
    /// baseline-time, otherwise there is one per unique time.
    pub time_array: Vec<f64>,
    /// Local sidereal times \[radians\], paired with `time_array`.
    pub lst_array: Vec<f64>,

    /// \[Hz\]
    pub freq_array: Vec<f64>,
    /// \[Hz\], one per channel.
    pub channel_width: Vec<f64>,
    pub spw_array: Vec<i32>,
    /// The spectral window of each channel.
    pub flex_spw_id_array: Vec<i32>,

    pub polarization_array: Polarizations,

    pub telescope: Telescope,
    pub history: History,
    pub label: String,
    pub extra_keywords: IndexMap<String, serde_json::Value>,
    /// The files this object was read from.
    pub filename: Vec<String>,
}

/// Options for making a new flag object from visibilities or calibration
/// solutions.
#[derive(Debug, Clone, Default)]
pub struct FlagSetOptions {
    pub mode: FlagMode,
    /// Copy the flags of the input into the new object (which then must be in
    /// flag mode).
    pub copy_flags: bool,
    /// Make a waterfall-type object.
    pub waterfall: bool,
    /// Text to start the history with.
    pub history: String,
    pub label: String,
}

impl FlagSet {
    /// Make a flag object from visibility metadata. The new object is baseline
    /// type, unless a waterfall is requested.
    pub fn from_visibility(
        vis: &VisibilityData,
        options: &FlagSetOptions,
    ) -> Result<FlagSet, FlagError> {
        let mode = copy_flags_mode(options)?;

        let nfreqs = vis.freq_array.len();
        let npols = vis.polarization_array.len();
        let (data, time_array, lst_array) = if options.waterfall {
            let (times, lsts) = unique_times_with_lsts(&vis.time_array, &vis.lst_array);
            let shape = (times.len(), nfreqs, npols);
            let values = match mode {
                FlagMode::Metric => Values::new_metric(shape),
                FlagMode::Flag => Values::new_flag(shape),
            };
            (FlagData::Waterfall { values }, times, lsts)
        } else {
            let shape = (vis.nblts(), nfreqs, npols);
            let values = if options.copy_flags {
                Values::Flag(vis.flag_array.clone().ok_or(FlagError::NoFlagsToCopy)?)
            } else {
                match mode {
                    FlagMode::Metric => Values::new_metric(shape),
                    FlagMode::Flag => Values::new_flag(shape),
                }
            };
            let data = FlagData::Baseline {
                ant_1_array: vis.ant_1_array.clone(),
                ant_2_array: vis.ant_2_array.clone(),
                baseline_array: vis.baseline_array.clone(),
                values,
            };
            (data, vis.time_array.clone(), vis.lst_array.clone())
        };

        let mut flags = FlagSet {
            data,
            time_array,
            lst_array,
            freq_array: vis.freq_array.clone(),
            channel_width: vis.channel_width.clone(),
            spw_array: vis.spw_array.clone(),
            flex_spw_id_array: vis.flex_spw_id_array.clone(),
            polarization_array: Polarizations::Codes(vis.polarization_array.clone()),
            telescope: vis.telescope.clone(),
            history: History::from(options.history.as_str()),
            label: options.label.clone(),
            extra_keywords: vis.extra_keywords.clone(),
            filename: vec![],
        };
        flags.record_creation(options.copy_flags, "visibility");
        flags.check()?;
        Ok(flags)
    }

    /// Make a flag object from calibration metadata. The new object is antenna
    /// type, unless a waterfall is requested.
    pub fn from_calibration(
        cal: &CalibrationData,
        options: &FlagSetOptions,
    ) -> Result<FlagSet, FlagError> {
        let freq_array = cal
            .freq_array
            .clone()
            .ok_or(FlagError::WideBandCalibration)?;
        let channel_width = cal
            .channel_width
            .clone()
            .ok_or(FlagError::MissingChannelWidth)?;
        let flex_spw_id_array = cal.flex_spw_ids();
        let mode = copy_flags_mode(options)?;

        let nfreqs = freq_array.len();
        let ntimes = cal.time_array.len();
        let njones = cal.jones_array.len();
        let data = if options.waterfall {
            let shape = (ntimes, nfreqs, njones);
            FlagData::Waterfall {
                values: match mode {
                    FlagMode::Metric => Values::new_metric(shape),
                    FlagMode::Flag => Values::new_flag(shape),
                },
            }
        } else {
            let shape = (cal.ant_array.len(), nfreqs, ntimes, njones);
            let values = if options.copy_flags {
                Values::Flag(cal.flag_array.clone().ok_or(FlagError::NoFlagsToCopy)?)
            } else {
                match mode {
                    FlagMode::Metric => Values::new_metric(shape),
                    FlagMode::Flag => Values::new_flag(shape),
                }
            };
            FlagData::Antenna {
                ant_array: cal.ant_array.clone(),
                values,
            }
        };

        let mut flags = FlagSet {
            data,
            time_array: cal.time_array.clone(),
            lst_array: cal.lst_array.clone(),
            freq_array,
            channel_width,
            spw_array: cal.spw_array.clone(),
            flex_spw_id_array,
            polarization_array: Polarizations::Codes(cal.jones_array.clone()),
            telescope: cal.telescope.clone(),
            history: History::from(options.history.as_str()),
            label: options.label.clone(),
            extra_keywords: cal.extra_keywords.clone(),
            filename: vec![],
        };
        flags.record_creation(options.copy_flags, "calibration");
        flags.check()?;
        Ok(flags)
    }

    fn record_creation(&mut self, copied_flags: bool, source: &str) {
        debug!(
            "Created a {} type, {} mode flag object from {source} data",
            self.flag_type(),
            self.mode()
        );
        if copied_flags {
            self.history
                .push(format!("Flags copied from a {source} object."));
        }
        self.history.record(format!(
            "Flag object with type \"{}\" created.",
            self.flag_type()
        ));
    }

    pub fn flag_type(&self) -> FlagType {
        self.data.flag_type()
    }

    pub fn mode(&self) -> FlagMode {
        self.data.mode()
    }

    /// Has the polarisation axis been collapsed into a single label?
    pub fn pol_collapsed(&self) -> bool {
        self.polarization_array.is_collapsed()
    }

    /// The number of unique times.
    pub fn ntimes(&self) -> usize {
        unique_f64(&self.time_array).len()
    }

    /// The number of baseline-times. Only baseline-type objects have these.
    pub fn nblts(&self) -> Option<usize> {
        self.baseline_rows().map(|(a1, _, _)| a1.len())
    }

    /// The number of unique baselines. Only baseline-type objects have these.
    pub fn nbls(&self) -> Option<usize> {
        self.baseline_rows()
            .map(|(_, _, bls)| bls.iter().unique().count())
    }

    /// The number of antennas with data. Waterfalls have no antennas.
    pub fn nants_data(&self) -> Option<usize> {
        self.get_ants().ok().map(|a| a.len())
    }

    pub fn nfreqs(&self) -> usize {
        self.freq_array.len()
    }

    pub fn npols(&self) -> usize {
        self.polarization_array.len()
    }

    /// The number of distinct spectral windows.
    pub fn nspws(&self) -> usize {
        self.spw_array.iter().unique().count()
    }

    pub(crate) fn baseline_rows(&self) -> Option<(&[u32], &[u32], &[u64])> {
        match &self.data {
            FlagData::Baseline {
                ant_1_array,
                ant_2_array,
                baseline_array,
                ..
            } => Some((ant_1_array, ant_2_array, baseline_array)),
            _ => None,
        }
    }

    pub(crate) fn ant_rows(&self) -> Option<&[u32]> {
        match &self.data {
            FlagData::Antenna { ant_array, .. } => Some(ant_array),
            _ => None,
        }
    }

    pub fn flag_array(&self) -> Option<ArrayViewD<bool>> {
        match &self.data {
            FlagData::Baseline {
                values: Values::Flag(f),
                ..
            }
            | FlagData::Waterfall {
                values: Values::Flag(f),
            } => Some(f.view().into_dyn()),
            FlagData::Antenna {
                values: Values::Flag(f),
                ..
            } => Some(f.view().into_dyn()),
            _ => None,
        }
    }

    pub fn flag_array_mut(&mut self) -> Option<ArrayViewMutD<bool>> {
        match &mut self.data {
            FlagData::Baseline {
                values: Values::Flag(f),
                ..
            }
            | FlagData::Waterfall {
                values: Values::Flag(f),
            } => Some(f.view_mut().into_dyn()),
            FlagData::Antenna {
                values: Values::Flag(f),
                ..
            } => Some(f.view_mut().into_dyn()),
            _ => None,
        }
    }

    pub fn metric_array(&self) -> Option<ArrayViewD<f64>> {
        self.float_array(|metric, _, _| Some(metric))
    }

    pub fn weights_array(&self) -> Option<ArrayViewD<f64>> {
        self.float_array(|_, weights, _| Some(weights))
    }

    pub fn weights_square_array(&self) -> Option<ArrayViewD<f64>> {
        self.float_array(|_, _, weights_square| weights_square)
    }

    fn float_array<'a>(
        &'a self,
        pick: impl Fn(
            ArrayViewD<'a, f64>,
            ArrayViewD<'a, f64>,
            Option<ArrayViewD<'a, f64>>,
        ) -> Option<ArrayViewD<'a, f64>>,
    ) -> Option<ArrayViewD<'a, f64>> {
        match &self.data {
            FlagData::Baseline {
                values:
                    Values::Metric {
                        metric,
                        weights,
                        weights_square,
                    },
                ..
            }
            | FlagData::Waterfall {
                values:
                    Values::Metric {
                        metric,
                        weights,
                        weights_square,
                    },
            } => pick(
                metric.view().into_dyn(),
                weights.view().into_dyn(),
                weights_square.as_ref().map(|ws| ws.view().into_dyn()),
            ),
            FlagData::Antenna {
                values:
                    Values::Metric {
                        metric,
                        weights,
                        weights_square,
                    },
                ..
            } => pick(
                metric.view().into_dyn(),
                weights.view().into_dyn(),
                weights_square.as_ref().map(|ws| ws.view().into_dyn()),
            ),
            _ => None,
        }
    }

    pub fn metric_array_mut(&mut self) -> Option<ArrayViewMutD<f64>> {
        match &mut self.data {
            FlagData::Baseline {
                values: Values::Metric { metric, .. },
                ..
            }
            | FlagData::Waterfall {
                values: Values::Metric { metric, .. },
            } => Some(metric.view_mut().into_dyn()),
            FlagData::Antenna {
                values: Values::Metric { metric, .. },
                ..
            } => Some(metric.view_mut().into_dyn()),
            _ => None,
        }
    }

    pub fn weights_array_mut(&mut self) -> Option<ArrayViewMutD<f64>> {
        match &mut self.data {
            FlagData::Baseline {
                values: Values::Metric { weights, .. },
                ..
            }
            | FlagData::Waterfall {
                values: Values::Metric { weights, .. },
            } => Some(weights.view_mut().into_dyn()),
            FlagData::Antenna {
                values: Values::Metric { weights, .. },
                ..
            } => Some(weights.view_mut().into_dyn()),
            _ => None,
        }
    }

    /// Get the row indices of an antenna pair.
    pub fn antpair2ind(&self, ant1: u32, ant2: u32) -> Result<Vec<usize>, FlagError> {
        let (a1s, a2s, _) = self
            .baseline_rows()
            .ok_or_else(|| FlagError::NoAntpairs(self.flag_type()))?;
        Ok(a1s
            .iter()
            .zip(a2s)
            .enumerate()
            .filter(|(_, (&a1, &a2))| a1 == ant1 && a2 == ant2)
            .map(|(i, _)| i)
            .collect())
    }

    /// Get the unique baseline numbers, sorted.
    pub fn get_baseline_nums(&self) -> Result<Vec<u64>, FlagError> {
        let (_, _, bls) = self
            .baseline_rows()
            .ok_or_else(|| FlagError::NoAntpairs(self.flag_type()))?;
        Ok(bls.iter().copied().unique().sorted().collect())
    }

    /// Get the unique antenna pairs, in the order they first appear.
    pub fn get_antpairs(&self) -> Result<Vec<(u32, u32)>, FlagError> {
        let (a1s, a2s, _) = self
            .baseline_rows()
            .ok_or_else(|| FlagError::NoAntpairs(self.flag_type()))?;
        Ok(a1s
            .iter()
            .copied()
            .zip(a2s.iter().copied())
            .unique()
            .collect())
    }

    /// Get the polarisations as strings, e.g. "xx".
    pub fn get_pols(&self) -> Vec<String> {
        self.polarization_array.names()
    }

    /// Get the unique antennas with data, sorted.
    pub fn get_ants(&self) -> Result<Vec<u32>, FlagError> {
        match &self.data {
            FlagData::Baseline {
                ant_1_array,
                ant_2_array,
                ..
            } => Ok(ant_1_array
                .iter()
                .chain(ant_2_array)
                .copied()
                .unique()
                .sorted()
                .collect()),
            FlagData::Antenna { ant_array, .. } => {
                Ok(ant_array.iter().copied().unique().sorted().collect())
            }
            FlagData::Waterfall { .. } => Err(FlagError::WaterfallHasNoAnts),
        }
    }

    /// Compare two flag objects. Floats are compared within tolerances; the
    /// history is only compared if asked for, and then without regard for the
    /// order of entries or version tags. Source filenames are never compared.
    pub fn equals(&self, other: &FlagSet, check_history: bool) -> bool {
        let data_match = match (&self.data, &other.data) {
            (
                FlagData::Baseline {
                    ant_1_array,
                    ant_2_array,
                    baseline_array,
                    values,
                },
                FlagData::Baseline {
                    ant_1_array: o_ant_1_array,
                    ant_2_array: o_ant_2_array,
                    baseline_array: o_baseline_array,
                    values: o_values,
                },
            ) => {
                ant_1_array == o_ant_1_array
                    && ant_2_array == o_ant_2_array
                    && baseline_array == o_baseline_array
                    && values.close_to(o_values)
            }
            (
                FlagData::Antenna { ant_array, values },
                FlagData::Antenna {
                    ant_array: o_ant_array,
                    values: o_values,
                },
            ) => ant_array == o_ant_array && values.close_to(o_values),
            (FlagData::Waterfall { values }, FlagData::Waterfall { values: o_values }) => {
                values.close_to(o_values)
            }
            _ => false,
        };
        if !data_match {
            debug!("Flag objects differ in their data");
            return false;
        }

        let coords_match = all_close(&self.time_array, &other.time_array, TIME_TOL)
            && all_close(&self.lst_array, &other.lst_array, LST_TOL)
            && all_close(&self.freq_array, &other.freq_array, FREQ_TOL)
            && all_close(&self.channel_width, &other.channel_width, FREQ_TOL)
            && self.spw_array == other.spw_array
            && self.flex_spw_id_array == other.flex_spw_id_array
            && self.polarization_array == other.polarization_array;
        if !coords_match {
            debug!("Flag objects differ in their coordinates");
            return false;
        }

        self.telescope == other.telescope
            && self.label == other.label
            && self.extra_keywords == other.extra_keywords
            && (!check_history || self.history.equivalent(&other.history))
    }
}

impl PartialEq for FlagSet {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, false)
    }
}

/// Work out which mode a new flag object should have, given whether flags are
/// being copied.
fn copy_flags_mode(options: &FlagSetOptions) -> Result<FlagMode, FlagError> {
    if !options.copy_flags {
        return Ok(options.mode);
    }
    if options.waterfall {
        return Err(FlagError::NotImplemented(
            "Cannot copy flags when initializing waterfall object.".to_string(),
        ));
    }
    if options.mode == FlagMode::Metric {
        warn!("Copying flags to type==\"baseline\"");
    }
    Ok(FlagMode::Flag)
}

/// Get the sorted unique times, as well as the LST of the first occurrence of
/// each.
pub(crate) fn unique_times_with_lsts(times: &[f64], lsts: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let unique_times = unique_f64(times);
    let unique_lsts = unique_times
        .iter()
        .map(|&t| {
            times
                .iter()
                .position(|&u| u == t)
                .and_then(|i| lsts.get(i))
                .copied()
                .unwrap_or(0.0)
        })
        .collect();
    (unique_times, unique_lsts)
}

/// Get the row indices of each unique time.
pub(crate) fn rows_by_time(times: &[f64], unique_times: &[f64]) -> Vec<Vec<usize>> {
    let mut rows = vec![vec![]; unique_times.len()];
    for (i_row, &t) in times.iter().enumerate() {
        if let Some(i_time) = find_close(unique_times, t, TIME_TOL) {
            rows[i_time].push(i_row);
        }
    }
    rows
}

/// The fraction of baseline-time rows flagged at each time.
fn baseline_flag_fraction(flags: ArrayView3<bool>, times: &[f64]) -> Array3<f64> {
    let unique_times = unique_f64(times);
    let (_, nfreqs, npols) = flags.dim();
    let mut out = Array3::zeros((unique_times.len(), nfreqs, npols));
    for (rows, mut out) in rows_by_time(times, &unique_times)
        .into_iter()
        .zip(out.outer_iter_mut())
    {
        let n = rows.len() as f64;
        for &row in &rows {
            Zip::from(&mut out)
                .and(flags.index_axis(Axis(0), row))
                .for_each(|o, &f| {
                    if f {
                        *o += 1.0 / n
                    }
                });
        }
    }
    out
}

/// The fraction of antennas flagged at each time.
fn antenna_flag_fraction(flags: ArrayView4<bool>) -> Array3<f64> {
    flags
        .mapv(|f| if f { 1.0 } else { 0.0 })
        .mean_axis(Axis(0))
        .map(|a| a.permuted_axes([1, 0, 2]).as_standard_layout().into_owned())
        .unwrap_or_else(|| {
            let (_, nfreqs, ntimes, npols) = flags.dim();
            Array3::zeros((ntimes, nfreqs, npols))
        })
}

/// Get the fraction of flagged data at each time, frequency and polarisation
/// of visibilities, calibration solutions or a flag-mode flag object. If a
/// flag array is supplied, it is used instead of the input's flags, and must
/// have the same shape as them.
///
/// The output has shape (Ntimes, Nfreqs, Npols), or (Ntimes, Nfreqs, 1) if
/// polarisations are averaged together.
pub fn flags_to_waterfall<'a>(
    input: Reference<'a>,
    flag_array: Option<ArrayViewD<'a, bool>>,
    keep_pol: bool,
) -> Result<Array3<f64>, FlagError> {
    let fraction = match input {
        Reference::Visibility(vis) => {
            let expected = [
                vis.nblts(),
                vis.freq_array.len(),
                vis.polarization_array.len(),
            ];
            let own = vis.flag_array.as_ref().map(|f| f.view().into_dyn());
            let flags = pick_flags(flag_array, own, &expected)?;
            baseline_flag_fraction(flags.into_dimensionality()?, &vis.time_array)
        }
        Reference::Calibration(cal) => {
            let nfreqs = cal
                .freq_array
                .as_ref()
                .ok_or(FlagError::WideBandCalibration)?
                .len();
            let expected = [
                cal.ant_array.len(),
                nfreqs,
                cal.time_array.len(),
                cal.jones_array.len(),
            ];
            let own = cal.flag_array.as_ref().map(|f| f.view().into_dyn());
            let flags = pick_flags(flag_array, own, &expected)?;
            antenna_flag_fraction(flags.into_dimensionality()?)
        }
        Reference::Flags(flag_set) => {
            let flags = pick_flags(flag_array, flag_set.flag_array(), flag_set.data.shape())?;
            match flag_set.flag_type() {
                FlagType::Baseline => {
                    baseline_flag_fraction(flags.into_dimensionality()?, &flag_set.time_array)
                }
                FlagType::Antenna => antenna_flag_fraction(flags.into_dimensionality()?),
                FlagType::Waterfall => flags
                    .into_dimensionality::<Ix3>()?
                    .mapv(|f| if f { 1.0 } else { 0.0 }),
            }
        }
    };

    if keep_pol {
        Ok(fraction)
    } else {
        let (ntimes, nfreqs, _) = fraction.dim();
        Ok(fraction
            .mean_axis(Axis(2))
            .map(|a| a.insert_axis(Axis(2)))
            .unwrap_or_else(|| Array3::zeros((ntimes, nfreqs, 1))))
    }
}

/// Use the supplied flags, or else the input's own flags. Either way, they
/// must have the expected shape.
fn pick_flags<'a>(
    supplied: Option<ArrayViewD<'a, bool>>,
    own: Option<ArrayViewD<'a, bool>>,
    expected: &[usize],
) -> Result<ArrayViewD<'a, bool>, FlagError> {
    let flags = supplied.or(own).ok_or(FlagError::NoFlagsToCopy)?;
    if flags.shape() != expected {
        return Err(FlagError::MisalignedFlags);
    }
    Ok(flags)
}
