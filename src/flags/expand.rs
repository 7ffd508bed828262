// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Expanding waterfall and antenna flag objects onto baselines or antennas.

use log::debug;
use ndarray::prelude::*;

use super::{FlagData, FlagError, FlagMode, FlagSet, FlagType, Values};
use crate::{
    constants::{FREQ_TOL, TIME_TOL},
    math::{all_close, find_close},
    polarisation::Polarizations,
    reference::{RefCoords, RefRows, Reference},
};

/// What must happen to the polarisation axis during an expansion.
enum PolPlan {
    Keep,
    /// Repeat the single polarisation for each of these.
    Repeat(Vec<i32>),
}

impl FlagSet {
    /// Check that the frequency and polarisation axes of a reference agree
    /// with this object's. Nothing is changed; empty spectral window arrays
    /// agree with anything and are filled by [`FlagSet::finish_expansion`].
    fn plan_expansion(&self, coords: &RefCoords, force_pol: bool) -> Result<PolPlan, FlagError> {
        if !all_close(&self.freq_array, coords.freq_array, FREQ_TOL) {
            return Err(FlagError::FreqMismatch {
                this: self.freq_array.clone(),
                other: coords.freq_array.to_vec(),
            });
        }
        if !all_close(&self.channel_width, coords.channel_width, FREQ_TOL) {
            return Err(FlagError::ChannelWidthMismatch {
                this: self.channel_width.clone(),
                other: coords.channel_width.to_vec(),
            });
        }
        // Unset spectral windows are taken from the reference.
        if !self.spw_array.is_empty() && self.spw_array != coords.spw_array {
            return Err(FlagError::SpwMismatch {
                this: self.spw_array.clone(),
                other: coords.spw_array.to_vec(),
            });
        }
        if !self.flex_spw_id_array.is_empty()
            && self.flex_spw_id_array != coords.flex_spw_id_array
        {
            return Err(FlagError::FlexSpwMismatch {
                this: self.flex_spw_id_array.clone(),
                other: coords.flex_spw_id_array.clone(),
            });
        }

        if self.polarization_array == coords.pols {
            return Ok(PolPlan::Keep);
        }
        let Polarizations::Codes(ref_codes) = &coords.pols else {
            return Err(FlagError::PolsDoNotMatch);
        };
        if self.polarization_array.uncollapsed_codes().as_ref() == Some(ref_codes) {
            return Ok(PolPlan::Repeat(ref_codes.clone()));
        }
        if force_pol {
            if self.npols() == 1 {
                Ok(PolPlan::Repeat(ref_codes.clone()))
            } else {
                Err(FlagError::PolsCouldNotMatch)
            }
        } else {
            Err(FlagError::PolsDoNotMatch)
        }
    }

    /// Expand this object onto the baselines of a reference. Waterfalls take
    /// the values of each baseline-time's time. Antenna-type flags are ORed
    /// together for each baseline's antennas; antennas or times that this
    /// object doesn't have are flagged.
    ///
    /// The reference must be baseline type (i.e. visibilities or a
    /// baseline-type flag object). Nothing changes if this object is already
    /// baseline type.
    pub fn to_baseline(&mut self, reference: Reference, force_pol: bool) -> Result<(), FlagError> {
        if self.flag_type() == FlagType::Baseline {
            return Ok(());
        }
        let coords = reference.coords();
        let RefRows::Baselines {
            ant_1_array,
            ant_2_array,
            baseline_array,
        } = coords.rows
        else {
            return Err(FlagError::BadReference {
                expected: FlagType::Baseline,
            });
        };
        if let FlagData::Antenna {
            values: Values::Metric { .. },
            ..
        } = self.data
        {
            return Err(FlagError::NotImplemented(
                "Cannot currently convert from antenna type, metric mode to baseline type."
                    .to_string(),
            ));
        }
        let pol_plan = self.plan_expansion(&coords, force_pol)?;

        // The time index of this object for each reference row.
        let time_indices: Vec<Option<usize>> = coords
            .time_array
            .iter()
            .map(|&t| find_close(&self.time_array, t, TIME_TOL))
            .collect();

        let values = match &self.data {
            FlagData::Waterfall { values } => {
                values.map(
                    |a| expand_rows(a, &time_indices),
                    |a| expand_rows(a, &time_indices),
                )
            }
            FlagData::Antenna { ant_array, values } => {
                let Values::Flag(flags) = values else {
                    return Err(FlagError::ModeMismatch {
                        this: FlagMode::Metric,
                        other: FlagMode::Flag,
                    });
                };
                let (_, nfreqs, _, npols) = flags.dim();
                let mut out = Array3::from_elem((coords.time_array.len(), nfreqs, npols), true);
                for (((mut row, &a1), &a2), i_time) in out
                    .outer_iter_mut()
                    .zip(ant_1_array)
                    .zip(ant_2_array)
                    .zip(&time_indices)
                {
                    let i1 = ant_array.iter().position(|&a| a == a1);
                    let i2 = ant_array.iter().position(|&a| a == a2);
                    if let (Some(i1), Some(i2), Some(i_time)) = (i1, i2, *i_time) {
                        let f1 = flags.slice(s![i1, .., i_time, ..]);
                        let f2 = flags.slice(s![i2, .., i_time, ..]);
                        ndarray::Zip::from(&mut row)
                            .and(&f1)
                            .and(&f2)
                            .for_each(|o, &f1, &f2| *o = f1 || f2);
                    }
                }
                Values::Flag(out)
            }
            FlagData::Baseline { .. } => return Ok(()),
        };
        let values = match &pol_plan {
            PolPlan::Keep => values,
            PolPlan::Repeat(codes) => values.select(Axis(2), &vec![0; codes.len()]),
        };

        debug!(
            "Expanding a {} type flag object onto {} baseline-times",
            self.flag_type(),
            coords.time_array.len()
        );
        self.data = FlagData::Baseline {
            ant_1_array: ant_1_array.to_vec(),
            ant_2_array: ant_2_array.to_vec(),
            baseline_array: baseline_array.to_vec(),
            values,
        };
        self.finish_expansion(&coords, pol_plan);
        self.history.record("Broadcast to type \"baseline\".");
        Ok(())
    }

    /// Expand a waterfall onto the antennas of a reference. Each antenna gets
    /// the values of the waterfall at each of the reference's times.
    ///
    /// The reference must be antenna type (i.e. calibration solutions or an
    /// antenna-type flag object). Nothing changes if this object is already
    /// antenna type.
    pub fn to_antenna(&mut self, reference: Reference, force_pol: bool) -> Result<(), FlagError> {
        match self.flag_type() {
            FlagType::Antenna => return Ok(()),
            FlagType::Baseline => {
                return Err(FlagError::BadConversion {
                    from: FlagType::Baseline,
                    to: FlagType::Antenna,
                })
            }
            FlagType::Waterfall => (),
        }
        let coords = reference.coords();
        let RefRows::Antennas { ant_array } = coords.rows else {
            return Err(FlagError::BadReference {
                expected: FlagType::Antenna,
            });
        };
        let pol_plan = self.plan_expansion(&coords, force_pol)?;

        let time_indices: Vec<Option<usize>> = coords
            .time_array
            .iter()
            .map(|&t| find_close(&self.time_array, t, TIME_TOL))
            .collect();
        let nants = ant_array.len();

        let FlagData::Waterfall { values } = &self.data else {
            return Ok(());
        };
        let values = values.map(
            |a| broadcast_antennas(expand_rows(a, &time_indices).view(), nants),
            |a| broadcast_antennas(expand_rows(a, &time_indices).view(), nants),
        );
        let values = match &pol_plan {
            PolPlan::Keep => values,
            PolPlan::Repeat(codes) => values.select(Axis(3), &vec![0; codes.len()]),
        };

        self.data = FlagData::Antenna {
            ant_array: ant_array.to_vec(),
            values,
        };
        self.finish_expansion(&coords, pol_plan);
        self.history.record("Broadcast to type \"antenna\".");
        Ok(())
    }

    fn finish_expansion(&mut self, coords: &RefCoords, pol_plan: PolPlan) {
        self.time_array = coords.time_array.to_vec();
        self.lst_array = coords.lst_array.to_vec();
        if self.spw_array.is_empty() {
            self.spw_array = coords.spw_array.to_vec();
        }
        if self.flex_spw_id_array.is_empty() {
            self.flex_spw_id_array = coords.flex_spw_id_array.clone();
        }
        if let PolPlan::Repeat(codes) = pol_plan {
            self.polarization_array = Polarizations::Codes(codes);
        }
        self.telescope.fill_missing_from(coords.telescope);
    }
}

/// Make a new array whose rows come from the supplied indices of the input.
/// Rows without an index are zero (or unflagged).
fn expand_rows<A: Clone + Default>(a: ArrayView3<A>, indices: &[Option<usize>]) -> Array3<A> {
    let (_, nfreqs, npols) = a.dim();
    let mut out = Array3::from_elem((indices.len(), nfreqs, npols), A::default());
    for (mut row, index) in out.outer_iter_mut().zip(indices) {
        if let Some(i) = index {
            row.assign(&a.index_axis(Axis(0), *i));
        }
    }
    out
}

/// Turn a (time, freq, pol) array into an (antenna, freq, time, pol) array
/// with identical values for each antenna.
fn broadcast_antennas<A: Clone>(a: ArrayView3<A>, nants: usize) -> Array4<A> {
    let per_ant = a.permuted_axes([1, 0, 2]);
    let (nfreqs, ntimes, npols) = per_ant.dim();
    match per_ant.broadcast((nants, nfreqs, ntimes, npols)) {
        Some(b) => b.to_owned(),
        None => Array4::from_shape_fn((nants, nfreqs, ntimes, npols), |(_, f, t, p)| {
            per_ant[(f, t, p)].clone()
        }),
    }
}
