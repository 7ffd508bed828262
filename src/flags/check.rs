// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Self-consistency checks on flag objects.

use itertools::Itertools;
use log::trace;

use super::{FlagData, FlagError, FlagSet, FlagType, Values};
use crate::math::{antnums_to_baseline, baseline_to_antnums};

fn check_len(name: &'static str, got: usize, expected: usize) -> Result<(), FlagError> {
    if got == expected {
        Ok(())
    } else {
        Err(FlagError::BadLength {
            name,
            expected,
            got,
        })
    }
}

fn check_values_shape<D: ndarray::Dimension>(
    values: &Values<D>,
    expected: &[usize],
) -> Result<(), FlagError> {
    let check = |name: &'static str, shape: &[usize]| {
        if shape == expected {
            Ok(())
        } else {
            Err(FlagError::BadShape {
                name,
                expected: expected.to_vec(),
                got: shape.to_vec(),
            })
        }
    };
    match values {
        Values::Metric {
            metric,
            weights,
            weights_square,
        } => {
            check("metric_array", metric.shape())?;
            check("weights_array", weights.shape())?;
            if let Some(ws) = weights_square {
                check("weights_square_array", ws.shape())?;
            }
            Ok(())
        }
        Values::Flag(f) => check("flag_array", f.shape()),
    }
}

impl FlagSet {
    /// Check that all of the arrays on this flag object are consistent with
    /// each other and with the object's type and mode.
    pub fn check(&self) -> Result<(), FlagError> {
        trace!("Checking a {} type flag object", self.flag_type());
        let ntimes = self.time_array.len();
        let nfreqs = self.nfreqs();
        let npols = self.npols();

        check_len("lst_array", self.lst_array.len(), ntimes)?;
        check_len("channel_width", self.channel_width.len(), nfreqs)?;
        check_len("flex_spw_id_array", self.flex_spw_id_array.len(), nfreqs)?;
        if self
            .flex_spw_id_array
            .iter()
            .any(|id| !self.spw_array.contains(id))
        {
            return Err(FlagError::UnknownSpw);
        }

        // Only baseline-type objects may repeat times.
        if self.flag_type() != FlagType::Baseline
            && self.time_array.iter().map(|t| t.to_bits()).unique().count() != ntimes
        {
            return Err(FlagError::RepeatedTimes(self.flag_type()));
        }

        let num_tel_ants = self.telescope.num_antennas();
        let in_telescope = |ants: &[u32]| match &self.telescope.antenna_numbers {
            Some(numbers) => ants.iter().all(|a| numbers.contains(a)),
            None => true,
        };

        match &self.data {
            FlagData::Baseline {
                ant_1_array,
                ant_2_array,
                baseline_array,
                values,
            } => {
                check_len("ant_1_array", ant_1_array.len(), ntimes)?;
                check_len("ant_2_array", ant_2_array.len(), ntimes)?;
                check_len("baseline_array", baseline_array.len(), ntimes)?;
                check_values_shape(values, &[ntimes, nfreqs, npols])?;
                if !in_telescope(ant_1_array) {
                    return Err(FlagError::AntennaNotInTelescope("ant_1_array"));
                }
                if !in_telescope(ant_2_array) {
                    return Err(FlagError::AntennaNotInTelescope("ant_2_array"));
                }
                let consistent = baseline_array
                    .iter()
                    .zip(ant_1_array.iter().zip(ant_2_array))
                    .all(|(&bl, (&a1, &a2))| {
                        baseline_to_antnums(bl) == (a1, a2)
                            || num_tel_ants
                                .map(|n| antnums_to_baseline(a1, a2, n) == bl)
                                .unwrap_or(false)
                    });
                if !consistent {
                    return Err(FlagError::BaselineMismatch);
                }
            }

            FlagData::Antenna { ant_array, values } => {
                check_values_shape(values, &[ant_array.len(), nfreqs, ntimes, npols])?;
                if !in_telescope(ant_array) {
                    return Err(FlagError::AntennaNotInTelescope("ant_array"));
                }
            }

            FlagData::Waterfall { values } => {
                check_values_shape(values, &[ntimes, nfreqs, npols])?;
            }
        }

        self.telescope.check()?;
        Ok(())
    }
}
