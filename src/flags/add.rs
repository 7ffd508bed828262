// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Concatenating flag objects along an axis.

use log::debug;
use ndarray::Axis;

use super::{FlagAxis, FlagData, FlagError, FlagSet, FlagType, Polarizations};
use crate::{
    constants::{FREQ_TOL, LST_TOL, TIME_TOL},
    math::{all_close, is_close},
};

impl FlagSet {
    /// The axis that objects of this type are combined along by default.
    pub fn default_axis(&self) -> FlagAxis {
        match self.flag_type() {
            FlagType::Antenna => FlagAxis::Antenna,
            _ => FlagAxis::Time,
        }
    }

    /// Combine this object with another along an axis, returning a new object.
    /// See [`FlagSet::add_inplace`].
    pub fn add(&self, other: &FlagSet, axis: Option<FlagAxis>) -> Result<FlagSet, FlagError> {
        let axis = axis.unwrap_or_else(|| self.default_axis());
        self.check_can_add(other, axis)?;
        let mut out = self.clone();
        out.append(other, axis)?;
        out.check()?;
        Ok(out)
    }

    /// Combine another object into this one along an axis (or along the
    /// [default axis](FlagSet::default_axis) if none is given). The other
    /// object's data are appended after this object's; nothing is sorted.
    ///
    /// Everything that doesn't vary along the axis must be the same on both
    /// objects, and the objects must not overlap along the axis. The
    /// exceptions are a few optional telescope fields, which are unset (with a
    /// warning) if they differ. Nothing is changed if the objects can't be
    /// combined.
    pub fn add_inplace(&mut self, other: &FlagSet, axis: Option<FlagAxis>) -> Result<(), FlagError> {
        *self = self.add(other, axis)?;
        Ok(())
    }

    /// Concatenate another object onto this one. Compatibility must already
    /// have been checked.
    fn append(&mut self, other: &FlagSet, axis: FlagAxis) -> Result<(), FlagError> {
        let (this_type, axis_name) = (self.flag_type(), axis.to_string());
        debug!("Combining {this_type} type flag objects along the {axis_name} axis");
        let data = match (&self.data, &other.data) {
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
            ) => match axis {
                FlagAxis::Time | FlagAxis::Baseline => FlagData::Baseline {
                    ant_1_array: concat(ant_1_array, o_ant_1_array),
                    ant_2_array: concat(ant_2_array, o_ant_2_array),
                    baseline_array: concat(baseline_array, o_baseline_array),
                    values: values.concatenate(o_values, Axis(0))?,
                },
                FlagAxis::Frequency | FlagAxis::Polarization => FlagData::Baseline {
                    ant_1_array: ant_1_array.clone(),
                    ant_2_array: ant_2_array.clone(),
                    baseline_array: baseline_array.clone(),
                    values: values.concatenate(o_values, data_axis(this_type, axis))?,
                },
                FlagAxis::Antenna => unreachable!("checked by check_can_add"),
            },

            (
                FlagData::Antenna { ant_array, values },
                FlagData::Antenna {
                    ant_array: o_ant_array,
                    values: o_values,
                },
            ) => FlagData::Antenna {
                ant_array: if axis == FlagAxis::Antenna {
                    concat(ant_array, o_ant_array)
                } else {
                    ant_array.clone()
                },
                values: values.concatenate(o_values, data_axis(this_type, axis))?,
            },

            (FlagData::Waterfall { values }, FlagData::Waterfall { values: o_values }) => {
                FlagData::Waterfall {
                    values: values.concatenate(o_values, data_axis(this_type, axis))?,
                }
            }

            _ => {
                return Err(FlagError::TypeMismatch {
                    this: self.flag_type(),
                    other: other.flag_type(),
                })
            }
        };

        self.data = data;
        match axis {
            FlagAxis::Time | FlagAxis::Baseline => {
                self.time_array.extend_from_slice(&other.time_array);
                self.lst_array.extend_from_slice(&other.lst_array);
            }
            FlagAxis::Frequency => {
                self.freq_array.extend_from_slice(&other.freq_array);
                self.channel_width.extend_from_slice(&other.channel_width);
                self.flex_spw_id_array
                    .extend_from_slice(&other.flex_spw_id_array);
                for spw in &other.spw_array {
                    if !self.spw_array.contains(spw) {
                        self.spw_array.push(*spw);
                    }
                }
            }
            FlagAxis::Polarization => {
                if let (Polarizations::Codes(codes), Polarizations::Codes(o_codes)) =
                    (&mut self.polarization_array, &other.polarization_array)
                {
                    codes.extend_from_slice(o_codes);
                }
            }
            FlagAxis::Antenna => (),
        }

        // Per-antenna fields are merged along the antenna axis, so only the
        // array-wide ones are compared there.
        self.telescope
            .null_differing_optional_fields(&other.telescope, axis == FlagAxis::Antenna);
        if axis == FlagAxis::Antenna {
            self.telescope.merge_antennas(&other.telescope);
        }

        for (key, value) in &other.extra_keywords {
            self.extra_keywords
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self.filename.extend(other.filename.iter().cloned());
        for entry in other.history.entries() {
            if !self.history.entries().contains(entry) {
                self.history.push(entry);
            }
        }
        self.history
            .record(format!("Data combined along {axis_name} axis."));
        Ok(())
    }

    /// Check that another object can be combined with this one along an axis.
    fn check_can_add(&self, other: &FlagSet, axis: FlagAxis) -> Result<(), FlagError> {
        if self.flag_type() != other.flag_type() {
            return Err(FlagError::TypeMismatch {
                this: self.flag_type(),
                other: other.flag_type(),
            });
        }
        if self.mode() != other.mode() {
            return Err(FlagError::ModeMismatch {
                this: self.mode(),
                other: other.mode(),
            });
        }
        match (axis, self.flag_type()) {
            (FlagAxis::Baseline, FlagType::Baseline) | (FlagAxis::Antenna, FlagType::Antenna) => {}
            (FlagAxis::Baseline, flag_type) => {
                return Err(FlagError::BadConcatAxis {
                    flag_type,
                    axis: "baseline",
                })
            }
            (FlagAxis::Antenna, flag_type) => {
                return Err(FlagError::BadConcatAxis {
                    flag_type,
                    axis: "antenna",
                })
            }
            _ => {}
        }
        if axis == FlagAxis::Polarization && (self.pol_collapsed() || other.pol_collapsed()) {
            return Err(FlagError::NotImplemented(
                "Two flag objects with their polarizations collapsed cannot be added along the polarization axis.".to_string(),
            ));
        }
        match (self.data.has_weights_square(), other.data.has_weights_square()) {
            (true, false) => return Err(FlagError::MissingWeightsSquare("second")),
            (false, true) => return Err(FlagError::MissingWeightsSquare("first")),
            _ => (),
        }

        // Everything that doesn't vary along the axis must match.
        let rows_vary = matches!(axis, FlagAxis::Time | FlagAxis::Baseline);
        if !rows_vary {
            if !all_close(&self.time_array, &other.time_array, TIME_TOL) {
                return Err(FlagError::FieldMismatch("time_array"));
            }
            if !all_close(&self.lst_array, &other.lst_array, LST_TOL) {
                return Err(FlagError::FieldMismatch("lst_array"));
            }
        }
        if axis != FlagAxis::Frequency {
            if !all_close(&self.freq_array, &other.freq_array, FREQ_TOL) {
                return Err(FlagError::FieldMismatch("freq_array"));
            }
            if !all_close(&self.channel_width, &other.channel_width, FREQ_TOL) {
                return Err(FlagError::FieldMismatch("channel_width"));
            }
            if self.flex_spw_id_array != other.flex_spw_id_array {
                return Err(FlagError::FieldMismatch("flex_spw_id_array"));
            }
            if self.spw_array != other.spw_array {
                return Err(FlagError::FieldMismatch("spw_array"));
            }
        }
        if axis != FlagAxis::Polarization && self.polarization_array != other.polarization_array {
            return Err(FlagError::FieldMismatch("polarization_array"));
        }
        match (&self.data, &other.data) {
            (
                FlagData::Baseline {
                    ant_1_array,
                    ant_2_array,
                    ..
                },
                FlagData::Baseline {
                    ant_1_array: o_ant_1_array,
                    ant_2_array: o_ant_2_array,
                    ..
                },
            ) if !rows_vary => {
                if ant_1_array != o_ant_1_array {
                    return Err(FlagError::FieldMismatch("ant_1_array"));
                }
                if ant_2_array != o_ant_2_array {
                    return Err(FlagError::FieldMismatch("ant_2_array"));
                }
            }
            (
                FlagData::Antenna { ant_array, .. },
                FlagData::Antenna {
                    ant_array: o_ant_array,
                    ..
                },
            ) if axis != FlagAxis::Antenna => {
                if ant_array != o_ant_array {
                    return Err(FlagError::FieldMismatch("ant_array"));
                }
            }
            _ => (),
        }

        self.check_no_overlap(other, axis)?;

        if let Some(field) = self.telescope.identity_mismatch(&other.telescope) {
            return Err(FlagError::FieldMismatch(field));
        }
        if axis != FlagAxis::Antenna {
            if let Some(field) = self.telescope.antenna_mismatch(&other.telescope) {
                return Err(FlagError::FieldMismatch(field));
            }
        }
        Ok(())
    }

    /// The objects must not share any values along the combining axis. For
    /// baseline-type objects combined along time or baseline, it's the
    /// (time, baseline) pairs that must not repeat.
    fn check_no_overlap(&self, other: &FlagSet, axis: FlagAxis) -> Result<(), FlagError> {
        let any_close = |a: &[f64], b: &[f64], tol| {
            b.iter().any(|&y| a.iter().any(|&x| is_close(x, y, tol)))
        };
        let overlaps = match (axis, &self.data, &other.data) {
            (
                FlagAxis::Time | FlagAxis::Baseline,
                FlagData::Baseline { baseline_array, .. },
                FlagData::Baseline {
                    baseline_array: o_baseline_array,
                    ..
                },
            ) => other
                .time_array
                .iter()
                .zip(o_baseline_array)
                .any(|(&o_t, o_bl)| {
                    self.time_array
                        .iter()
                        .zip(baseline_array)
                        .any(|(&t, bl)| bl == o_bl && is_close(t, o_t, TIME_TOL))
                }),
            (FlagAxis::Time, _, _) => any_close(&self.time_array, &other.time_array, TIME_TOL),
            (FlagAxis::Frequency, _, _) => {
                any_close(&self.freq_array, &other.freq_array, FREQ_TOL)
            }
            (FlagAxis::Polarization, _, _) => {
                match (&self.polarization_array, &other.polarization_array) {
                    (Polarizations::Codes(a), Polarizations::Codes(b)) => {
                        b.iter().any(|c| a.contains(c))
                    }
                    _ => false,
                }
            }
            (
                FlagAxis::Antenna,
                FlagData::Antenna { ant_array, .. },
                FlagData::Antenna {
                    ant_array: o_ant_array,
                    ..
                },
            ) => o_ant_array.iter().any(|a| ant_array.contains(a)),
            _ => false,
        };
        if overlaps {
            let name = match axis {
                FlagAxis::Time => "time",
                FlagAxis::Baseline => "baseline",
                FlagAxis::Antenna => "antenna",
                FlagAxis::Frequency => "frequency",
                FlagAxis::Polarization => "polarization",
            };
            return Err(FlagError::Overlap(name));
        }
        Ok(())
    }
}

/// The data axis corresponding to a combining axis.
fn data_axis(flag_type: FlagType, axis: FlagAxis) -> Axis {
    match (flag_type, axis) {
        (FlagType::Antenna, FlagAxis::Time) => Axis(2),
        (FlagType::Antenna, FlagAxis::Polarization) => Axis(3),
        (_, FlagAxis::Frequency) => Axis(1),
        (_, FlagAxis::Polarization) => Axis(2),
        _ => Axis(0),
    }
}

fn concat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let mut v = a.to_vec();
    v.extend_from_slice(b);
    v
}

impl std::ops::Add for &FlagSet {
    type Output = Result<FlagSet, FlagError>;

    fn add(self, other: &FlagSet) -> Self::Output {
        FlagSet::add(self, other, None)
    }
}
