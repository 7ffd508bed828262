// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Selecting subsets of flag objects.
//!
//! Each criterion selects indices along one axis; the result is the
//! intersection of all of them. Within a criterion, any of the requested values
//! may match. Requested values that aren't in the data are handled according
//! to the `strict` setting:
//!
//! - `Some(true)`: it's an error;
//! - `None`: they are ignored, but it's an error if nothing is selected;
//! - `Some(false)`: they are ignored with a warning. A criterion with none of
//!   its values present selects everything.
//!
//! Whatever the setting, it's an error for criteria to select nothing.

mod ant_str;

use std::fmt::Display;

use itertools::Itertools;
use log::{debug, warn};
use ndarray::Axis;

use super::{FlagData, FlagError, FlagSet, FlagType};
use crate::{
    constants::{FREQ_TOL, TIME_TOL},
    math::{find_close, unique_f64},
    polarisation::{pol_str_to_num, Polarizations},
};

/// An antenna pair to select, optionally along with a polarisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineSelection {
    pub ant1: u32,
    pub ant2: u32,
    pub pol: Option<String>,
}

impl From<(u32, u32)> for BaselineSelection {
    fn from((ant1, ant2): (u32, u32)) -> Self {
        BaselineSelection {
            ant1,
            ant2,
            pol: None,
        }
    }
}

impl From<(u32, u32, &str)> for BaselineSelection {
    fn from((ant1, ant2, pol): (u32, u32, &str)) -> Self {
        BaselineSelection {
            ant1,
            ant2,
            pol: Some(pol.to_string()),
        }
    }
}

/// A polarisation to select, either as a code or as a string like "xx".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolSelection {
    Code(i32),
    Name(String),
}

impl From<i32> for PolSelection {
    fn from(c: i32) -> Self {
        PolSelection::Code(c)
    }
}

impl From<&str> for PolSelection {
    fn from(s: &str) -> Self {
        PolSelection::Name(s.to_string())
    }
}

impl Display for PolSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolSelection::Code(c) => write!(f, "{c}"),
            PolSelection::Name(n) => write!(f, "{n}"),
        }
    }
}

/// What to select from a flag object.
#[derive(Debug, Clone)]
pub struct SelectCriteria {
    /// Baseline-time row indices (baseline type only).
    pub blt_inds: Option<Vec<i64>>,
    pub antenna_nums: Option<Vec<u32>>,
    /// Antenna pairs (baseline type only). The order of the antennas doesn't
    /// matter.
    pub bls: Option<Vec<BaselineSelection>>,
    pub times: Option<Vec<f64>>,
    pub frequencies: Option<Vec<f64>>,
    pub freq_chans: Option<Vec<usize>>,
    pub polarizations: Option<Vec<PolSelection>>,
    /// An antenna string, e.g. "1_2,3x_4y,-5" (baseline type only).
    pub ant_str: Option<String>,
    /// Discard the requested values rather than keep them.
    pub invert: bool,
    pub strict: Option<bool>,
}

impl Default for SelectCriteria {
    fn default() -> Self {
        SelectCriteria {
            blt_inds: None,
            antenna_nums: None,
            bls: None,
            times: None,
            frequencies: None,
            freq_chans: None,
            polarizations: None,
            ant_str: None,
            invert: false,
            strict: Some(false),
        }
    }
}

impl SelectCriteria {
    pub fn new() -> SelectCriteria {
        SelectCriteria::default()
    }

    pub fn blt_inds(mut self, inds: Vec<i64>) -> Self {
        self.blt_inds = Some(inds);
        self
    }

    pub fn antenna_nums(mut self, nums: Vec<u32>) -> Self {
        self.antenna_nums = Some(nums);
        self
    }

    pub fn bls<B: Into<BaselineSelection>>(mut self, bls: Vec<B>) -> Self {
        self.bls = Some(bls.into_iter().map(|b| b.into()).collect());
        self
    }

    pub fn times(mut self, times: Vec<f64>) -> Self {
        self.times = Some(times);
        self
    }

    pub fn frequencies(mut self, freqs: Vec<f64>) -> Self {
        self.frequencies = Some(freqs);
        self
    }

    pub fn freq_chans(mut self, chans: Vec<usize>) -> Self {
        self.freq_chans = Some(chans);
        self
    }

    pub fn polarizations<P: Into<PolSelection>>(mut self, pols: Vec<P>) -> Self {
        self.polarizations = Some(pols.into_iter().map(|p| p.into()).collect());
        self
    }

    pub fn ant_str<S: Into<String>>(mut self, ant_str: S) -> Self {
        self.ant_str = Some(ant_str.into());
        self
    }

    pub fn invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn strict(mut self, strict: Option<bool>) -> Self {
        self.strict = strict;
        self
    }
}

/// The indices to keep along each axis. `None` means keep everything.
#[derive(Debug, Default)]
struct Selection {
    rows: Option<Vec<usize>>,
    times: Option<Vec<usize>>,
    freqs: Option<Vec<usize>>,
    pols: Option<Vec<usize>>,
    applied: Vec<&'static str>,
}

/// Split requested values into those present and missing, then apply the
/// strictness policy. `Ok(None)` means the criterion should be ignored.
fn filter_present<'a, T>(
    requested: &'a [T],
    is_present: impl Fn(&T) -> bool,
    strict: Option<bool>,
    missing_error: impl Fn(&[&'a T]) -> FlagError,
) -> Result<Option<Vec<&'a T>>, FlagError> {
    let (present, missing): (Vec<&T>, Vec<&T>) = requested.iter().partition(|v| is_present(v));
    if missing.is_empty() {
        return Ok(Some(present));
    }
    match strict {
        Some(true) => Err(missing_error(&missing)),
        None => Ok(Some(present)),
        Some(false) => {
            warn!("{}; ignoring", missing_error(&missing));
            if present.is_empty() {
                Ok(None)
            } else {
                Ok(Some(present))
            }
        }
    }
}

/// Turn a "keep" mask into indices, inverting it if requested.
fn mask_to_indices(mask: impl Iterator<Item = bool>, invert: bool) -> Vec<usize> {
    mask.enumerate()
        .filter(|(_, keep)| *keep != invert)
        .map(|(i, _)| i)
        .collect()
}

/// Intersect an optional set of indices with another.
fn intersect(current: Option<Vec<usize>>, new: Vec<usize>) -> Vec<usize> {
    match current {
        None => new,
        Some(current) => current.into_iter().filter(|i| new.contains(i)).collect(),
    }
}

fn join_display<T: Display>(values: &[&T]) -> String {
    format!("[{}]", values.iter().join(", "))
}

impl FlagSet {
    /// Select a subset of this object, returning a new object.
    pub fn select(&self, criteria: &SelectCriteria) -> Result<FlagSet, FlagError> {
        let mut out = self.clone();
        out.select_inplace(criteria)?;
        Ok(out)
    }

    /// Select a subset of this object. Nothing is changed if the selection
    /// fails.
    pub fn select_inplace(&mut self, criteria: &SelectCriteria) -> Result<(), FlagError> {
        let selection = self.build_selection(criteria)?;
        if selection.applied.is_empty() {
            debug!("No selection criteria applied");
            return Ok(());
        }
        self.apply_selection(&selection);
        self.history.record(format!(
            "Downselected to specific {} using {}.",
            selection.applied.join(", "),
            env!("CARGO_PKG_NAME")
        ));
        Ok(())
    }

    fn build_selection(&self, criteria: &SelectCriteria) -> Result<Selection, FlagError> {
        let invert = criteria.invert;
        let strict = criteria.strict;
        let flag_type = self.flag_type();

        let mut bls = criteria.bls.clone();
        let mut polarizations = criteria.polarizations.clone();
        if let Some(ant_str) = &criteria.ant_str {
            if criteria.antenna_nums.is_some() || bls.is_some() || polarizations.is_some() {
                return Err(FlagError::AntStrWithOthers);
            }
            let (pairs, pols) = self.parse_ants(ant_str)?;
            if pols.is_some() && invert {
                return Err(FlagError::AntStrPolsWithInvert);
            }
            bls = pairs.map(|p| p.into_iter().map(BaselineSelection::from).collect());
            polarizations = pols.map(|p| p.into_iter().map(PolSelection::Name).collect());
        }

        // Type restrictions.
        if flag_type == FlagType::Waterfall {
            if criteria.antenna_nums.is_some() {
                return Err(FlagError::SelectOnWaterfall("antenna_nums"));
            }
            if bls.is_some() {
                return Err(FlagError::SelectOnWaterfall("bls"));
            }
        }
        if flag_type != FlagType::Baseline {
            if criteria.blt_inds.is_some() {
                return Err(FlagError::SelectNeedsBaselineType("blt"));
            }
            if bls.is_some() {
                return Err(FlagError::SelectNeedsBaselineType("baseline"));
            }
        }

        // Polarisations attached to baselines join the polarisation criterion.
        if let Some(bls) = &bls {
            let bl_pols: Vec<PolSelection> = bls
                .iter()
                .filter_map(|b| b.pol.clone().map(PolSelection::Name))
                .collect();
            if !bl_pols.is_empty() {
                if invert {
                    return Err(FlagError::PolTuplesWithInvert);
                }
                let pols = polarizations.get_or_insert_with(Vec::new);
                for p in bl_pols {
                    if !pols.contains(&p) {
                        pols.push(p);
                    }
                }
            }
        }

        let mut selection = Selection::default();
        match &self.data {
            FlagData::Baseline {
                ant_1_array,
                ant_2_array,
                ..
            } => self.select_blt_rows(
                &mut selection,
                criteria,
                bls.as_deref(),
                ant_1_array,
                ant_2_array,
            )?,
            FlagData::Antenna { ant_array, .. } => {
                if let Some(nums) = &criteria.antenna_nums {
                    let present = filter_present(
                        nums,
                        |a| ant_array.contains(a),
                        strict,
                        |missing| FlagError::NotPresent {
                            what: "Antenna number",
                            values: join_display(missing),
                            array: "ant_array",
                        },
                    )?;
                    if let Some(present) = present {
                        let rows = mask_to_indices(
                            ant_array.iter().map(|a| present.contains(&a)),
                            invert,
                        );
                        if rows.is_empty() {
                            return Err(FlagError::EmptyAntennaSelection);
                        }
                        selection.rows = Some(rows);
                        selection.applied.push("antennas");
                    }
                }
            }
            FlagData::Waterfall { .. } => (),
        }

        self.select_times(&mut selection, criteria)?;
        self.select_freqs(&mut selection, criteria)?;
        self.select_pols(&mut selection, polarizations.as_deref(), criteria)?;
        Ok(selection)
    }

    /// Select baseline-time rows by index, antenna and antenna pair.
    fn select_blt_rows(
        &self,
        selection: &mut Selection,
        criteria: &SelectCriteria,
        bls: Option<&[BaselineSelection]>,
        ant_1_array: &[u32],
        ant_2_array: &[u32],
    ) -> Result<(), FlagError> {
        let invert = criteria.invert;
        let strict = criteria.strict;
        let nblts = ant_1_array.len();
        let mut rows: Option<Vec<usize>> = None;

        if let Some(inds) = &criteria.blt_inds {
            if inds.iter().any(|&i| i < 0) {
                return Err(FlagError::BltIndsNegative);
            }
            if inds.iter().any(|&i| i as usize >= nblts) {
                return Err(FlagError::BltIndsTooLarge);
            }
            let wanted: Vec<usize> = inds.iter().map(|&i| i as usize).collect();
            rows = Some(mask_to_indices((0..nblts).map(|i| wanted.contains(&i)), invert));
            selection.applied.push("baseline-times");
        }

        if let Some(nums) = &criteria.antenna_nums {
            let ants = self.get_ants()?;
            let present = filter_present(
                nums,
                |a| ants.contains(a),
                strict,
                |missing| FlagError::NotPresent {
                    what: "Antenna number",
                    values: join_display(missing),
                    array: "ant_1_array or ant_2_array",
                },
            )?;
            if let Some(present) = present {
                // Keeping needs both antennas; discarding needs neither.
                let new = (0..nblts)
                    .filter(|&i| {
                        let has1 = present.contains(&&ant_1_array[i]);
                        let has2 = present.contains(&&ant_2_array[i]);
                        if invert {
                            !has1 && !has2
                        } else {
                            has1 && has2
                        }
                    })
                    .collect();
                rows = Some(intersect(rows, new));
                selection.applied.push("antennas");
            }
        }

        if let Some(bls) = bls {
            let matches = |bl: &BaselineSelection, i: usize| {
                (ant_1_array[i] == bl.ant1 && ant_2_array[i] == bl.ant2)
                    || (ant_1_array[i] == bl.ant2 && ant_2_array[i] == bl.ant1)
            };
            let present = filter_present(
                bls,
                |bl| (0..nblts).any(|i| matches(bl, i)),
                strict,
                |missing| FlagError::NotPresent {
                    what: "Antenna pair",
                    values: missing
                        .iter()
                        .map(|bl| format!("({}, {})", bl.ant1, bl.ant2))
                        .join(", "),
                    array: "data",
                },
            )?;
            if let Some(present) = present {
                let new = mask_to_indices(
                    (0..nblts).map(|i| present.iter().any(|bl| matches(bl, i))),
                    invert,
                );
                rows = Some(intersect(rows, new));
                selection.applied.push("antenna pairs");
            }
        }

        if let Some(rows) = &rows {
            if rows.is_empty() {
                if let Some(ant_str) = &criteria.ant_str {
                    return Err(FlagError::AntStrNoMatch(ant_str.clone()));
                }
                return Err(FlagError::NoMatchingBlts);
            }
        }
        selection.rows = rows;
        Ok(())
    }

    fn select_times(
        &self,
        selection: &mut Selection,
        criteria: &SelectCriteria,
    ) -> Result<(), FlagError> {
        let Some(times) = &criteria.times else {
            return Ok(());
        };
        let unique_times = unique_f64(&self.time_array);
        let Some(present) = filter_present(
            times,
            |&t| find_close(&unique_times, t, TIME_TOL).is_some(),
            criteria.strict,
            |missing| FlagError::NotPresent {
                what: "Time",
                values: missing.iter().join(", "),
                array: "time_array",
            },
        )?
        else {
            return Ok(());
        };

        let keep = self
            .time_array
            .iter()
            .map(|&t| present.iter().any(|&&p| find_close(&[p], t, TIME_TOL).is_some()));
        let indices = mask_to_indices(keep, criteria.invert);
        match self.flag_type() {
            // Times are rows of baseline-type objects.
            FlagType::Baseline => {
                let rows = intersect(selection.rows.take(), indices);
                if rows.is_empty() {
                    return Err(FlagError::EmptyTimeSelection);
                }
                selection.rows = Some(rows);
            }
            _ => {
                if indices.is_empty() {
                    return Err(FlagError::EmptyTimeSelection);
                }
                selection.times = Some(indices);
            }
        }
        selection.applied.push("times");
        Ok(())
    }

    fn select_freqs(
        &self,
        selection: &mut Selection,
        criteria: &SelectCriteria,
    ) -> Result<(), FlagError> {
        if criteria.frequencies.is_none() && criteria.freq_chans.is_none() {
            return Ok(());
        }
        let nfreqs = self.nfreqs();
        let mut wanted: Vec<usize> = vec![];
        let mut any_applied = false;

        if let Some(chans) = &criteria.freq_chans {
            if let Some(present) = filter_present(
                chans,
                |&c| c < nfreqs,
                criteria.strict,
                |missing| FlagError::NotPresent {
                    what: "Frequency channel",
                    values: join_display(missing),
                    array: "freq_array",
                },
            )? {
                wanted.extend(present.into_iter().copied());
                any_applied = true;
            }
        }
        if let Some(freqs) = &criteria.frequencies {
            if let Some(present) = filter_present(
                freqs,
                |&f| find_close(&self.freq_array, f, FREQ_TOL).is_some(),
                criteria.strict,
                |missing| FlagError::NotPresent {
                    what: "Frequency",
                    values: missing.iter().join(", "),
                    array: "freq_array",
                },
            )? {
                wanted.extend(
                    present
                        .into_iter()
                        .filter_map(|&f| find_close(&self.freq_array, f, FREQ_TOL)),
                );
                any_applied = true;
            }
        }
        if !any_applied {
            return Ok(());
        }

        let indices = mask_to_indices((0..nfreqs).map(|i| wanted.contains(&i)), criteria.invert);
        if indices.is_empty() {
            return Err(FlagError::EmptyFreqSelection);
        }
        selection.freqs = Some(indices);
        selection.applied.push("frequencies");
        Ok(())
    }

    fn select_pols(
        &self,
        selection: &mut Selection,
        polarizations: Option<&[PolSelection]>,
        criteria: &SelectCriteria,
    ) -> Result<(), FlagError> {
        let Some(polarizations) = polarizations else {
            return Ok(());
        };
        let pol_index = |p: &PolSelection| -> Option<usize> {
            match (&self.polarization_array, p) {
                (Polarizations::Codes(codes), PolSelection::Code(c)) => {
                    codes.iter().position(|code| code == c)
                }
                (Polarizations::Codes(codes), PolSelection::Name(n)) => {
                    let c = pol_str_to_num(n)?;
                    codes.iter().position(|&code| code == c)
                }
                (Polarizations::Collapsed(label), PolSelection::Name(n)) => {
                    (label == n).then_some(0)
                }
                (Polarizations::Collapsed(label), PolSelection::Code(c)) => {
                    (label == &c.to_string()).then_some(0)
                }
            }
        };
        let Some(present) = filter_present(
            polarizations,
            |p| pol_index(p).is_some(),
            criteria.strict,
            |missing| FlagError::NotPresent {
                what: "Polarization",
                values: missing.iter().join(", "),
                array: "polarization_array",
            },
        )?
        else {
            return Ok(());
        };

        let wanted: Vec<usize> = present.into_iter().filter_map(&pol_index).collect();
        let indices = mask_to_indices(
            (0..self.npols()).map(|i| wanted.contains(&i)),
            criteria.invert,
        );
        if indices.is_empty() {
            return Err(FlagError::EmptyPolSelection);
        }
        selection.pols = Some(indices);
        selection.applied.push("polarizations");
        Ok(())
    }

    /// Keep only the selected indices. The selection must have come from this
    /// object.
    fn apply_selection(&mut self, selection: &Selection) {
        let flag_type = self.flag_type();
        let (time_axis, pol_axis) = match flag_type {
            FlagType::Antenna => (Axis(2), Axis(3)),
            _ => (Axis(0), Axis(2)),
        };

        match &mut self.data {
            FlagData::Baseline {
                ant_1_array,
                ant_2_array,
                baseline_array,
                values,
            } => {
                if let Some(rows) = &selection.rows {
                    *ant_1_array = pick(ant_1_array, rows);
                    *ant_2_array = pick(ant_2_array, rows);
                    *baseline_array = pick(baseline_array, rows);
                    *values = values.select(Axis(0), rows);
                }
                if let Some(freqs) = &selection.freqs {
                    *values = values.select(Axis(1), freqs);
                }
                if let Some(pols) = &selection.pols {
                    *values = values.select(pol_axis, pols);
                }
            }
            FlagData::Antenna { ant_array, values } => {
                if let Some(rows) = &selection.rows {
                    *ant_array = pick(ant_array, rows);
                    *values = values.select(Axis(0), rows);
                }
                if let Some(times) = &selection.times {
                    *values = values.select(time_axis, times);
                }
                if let Some(freqs) = &selection.freqs {
                    *values = values.select(Axis(1), freqs);
                }
                if let Some(pols) = &selection.pols {
                    *values = values.select(pol_axis, pols);
                }
            }
            FlagData::Waterfall { values } => {
                if let Some(times) = &selection.times {
                    *values = values.select(time_axis, times);
                }
                if let Some(freqs) = &selection.freqs {
                    *values = values.select(Axis(1), freqs);
                }
                if let Some(pols) = &selection.pols {
                    *values = values.select(pol_axis, pols);
                }
            }
        }

        let time_rows = match flag_type {
            FlagType::Baseline => &selection.rows,
            _ => &selection.times,
        };
        if let Some(rows) = time_rows {
            self.time_array = pick(&self.time_array, rows);
            self.lst_array = pick(&self.lst_array, rows);
        }
        if let Some(freqs) = &selection.freqs {
            self.freq_array = pick(&self.freq_array, freqs);
            self.channel_width = pick(&self.channel_width, freqs);
            self.flex_spw_id_array = pick(&self.flex_spw_id_array, freqs);
            let remaining = &self.flex_spw_id_array;
            self.spw_array.retain(|spw| remaining.contains(spw));
        }
        if let Some(pols) = &selection.pols {
            self.polarization_array = self.polarization_array.select(pols);
        }
    }
}

fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}
