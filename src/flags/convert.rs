// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversions between modes, and collapsing data into waterfalls.

use log::{debug, warn};
use ndarray::prelude::*;

use super::{
    rows_by_time, unique_times_with_lsts,
    values::{collapse, collapse_last_axis, weights_from_flags},
    CollapseMethod, FlagData, FlagError, FlagMode, FlagSet, Values,
};

impl FlagSet {
    /// Convert metrics into flags. Metrics above the threshold (or above 0, if
    /// no threshold is given) are flagged. Nothing happens if this object
    /// already holds flags.
    pub fn to_flag(&mut self, threshold: Option<f64>) {
        if self.mode() == FlagMode::Flag {
            return;
        }
        let threshold = threshold.unwrap_or(0.0);
        debug!("Converting metrics to flags with threshold {threshold}");
        match &mut self.data {
            FlagData::Baseline { values, .. } | FlagData::Waterfall { values } => {
                *values = values.to_flag(threshold);
            }
            FlagData::Antenna { values, .. } => *values = values.to_flag(threshold),
        }
        self.history.record("Converted to mode \"flag\".");
    }

    /// Convert flags into metrics. The metrics are all zero. The weights are
    /// all one, unless `convert_wgts` is set, in which case weights are zero
    /// wherever a whole row or column of a time-frequency plane is flagged.
    /// Nothing happens if this object already holds metrics.
    pub fn to_metric(&mut self, convert_wgts: bool) {
        if self.mode() == FlagMode::Metric {
            return;
        }
        let antpair_rows = self.get_antpairs().ok().map(|pairs| {
            pairs
                .into_iter()
                .filter_map(|(a1, a2)| self.antpair2ind(a1, a2).ok())
                .collect::<Vec<_>>()
        });

        match &mut self.data {
            FlagData::Waterfall { values } => {
                if let Values::Flag(flags) = &*values {
                    let weights = if convert_wgts {
                        plane_weights(flags.view())
                    } else {
                        Array3::ones(flags.raw_dim())
                    };
                    *values = metric_with_weights(weights);
                }
            }

            FlagData::Baseline { values, .. } => {
                if let Values::Flag(flags) = &*values {
                    let mut weights = Array3::ones(flags.raw_dim());
                    if convert_wgts {
                        for rows in antpair_rows.iter().flatten() {
                            let pair_weights = plane_weights(flags.select(Axis(0), rows).view());
                            for (&row, w) in rows.iter().zip(pair_weights.outer_iter()) {
                                weights.index_axis_mut(Axis(0), row).assign(&w);
                            }
                        }
                    }
                    *values = metric_with_weights(weights);
                }
            }

            FlagData::Antenna { values, .. } => {
                if let Values::Flag(flags) = &*values {
                    let mut weights = Array4::ones(flags.raw_dim());
                    if convert_wgts {
                        for (mut w, f) in weights.outer_iter_mut().zip(flags.outer_iter()) {
                            w.assign(&plane_weights(f));
                        }
                    }
                    *values = metric_with_weights(weights);
                }
            }
        }
        self.history.record("Converted to mode \"metric\".");
    }

    /// Collapse the baseline or antenna axis of this object, leaving a
    /// waterfall.
    ///
    /// Metrics are collapsed with a weighted mean of the given kind. Flags are
    /// collapsed logically with "or" or "and"; any other method converts the
    /// flags to metrics (with converted weights) first, and the waterfall ends
    /// up with metrics. If `keep_pol` is false, the polarisation axis is also
    /// collapsed.
    pub fn to_waterfall(
        &mut self,
        method: CollapseMethod,
        keep_pol: bool,
        return_weights_square: bool,
    ) -> Result<(), FlagError> {
        if let FlagData::Waterfall { .. } = self.data {
            if keep_pol || self.npols() == 1 {
                warn!("This object is already a waterfall. Nothing to change.");
                return Ok(());
            }
            return self.collapse_pol(method);
        }
        if self.mode() == FlagMode::Metric && method.is_logical() {
            return Err(FlagError::LogicalCollapseOnMetric(method));
        }
        if self.mode() == FlagMode::Flag && !method.is_logical() {
            self.to_metric(true);
        }

        let (times, lsts) = unique_times_with_lsts(&self.time_array, &self.lst_array);
        let values = match &self.data {
            FlagData::Baseline { values, .. } => {
                let (_, nfreqs, npols) = values_dim(values);
                let parts = rows_by_time(&self.time_array, &times)
                    .iter()
                    .map(|rows| {
                        collapse(
                            &values.select(Axis(0), rows),
                            Axis(0),
                            method,
                            return_weights_square,
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                stack_planes(&parts, (nfreqs, npols), values.mode())?
            }
            FlagData::Antenna { values, .. } => {
                let collapsed = collapse(values, Axis(0), method, return_weights_square)?;
                collapsed.map(
                    |a| a.permuted_axes([1, 0, 2]).as_standard_layout().into_owned(),
                    |a| a.permuted_axes([1, 0, 2]).as_standard_layout().into_owned(),
                )
            }
            FlagData::Waterfall { .. } => unreachable!("waterfalls returned early"),
        };

        self.data = FlagData::Waterfall { values };
        self.time_array = times;
        self.lst_array = lsts;
        self.history.record("Collapsed to type \"waterfall\".");

        if !keep_pol && self.npols() > 1 {
            self.collapse_pol(method)?;
        }
        Ok(())
    }

    /// Collapse the polarisation axis, replacing the polarisations with a
    /// single label naming all of them.
    pub fn collapse_pol(&mut self, method: CollapseMethod) -> Result<(), FlagError> {
        if self.npols() == 1 {
            warn!("Cannot collapse polarization axis when only one pol present.");
            return Ok(());
        }
        if self.mode() == FlagMode::Metric && method.is_logical() {
            return Err(FlagError::LogicalCollapseOnMetric(method));
        }
        if self.mode() == FlagMode::Flag && !method.is_logical() {
            self.to_metric(true);
        }

        match &mut self.data {
            FlagData::Baseline { values, .. } | FlagData::Waterfall { values } => {
                *values = collapse_last_axis(values, method)?;
            }
            FlagData::Antenna { values, .. } => *values = collapse_last_axis(values, method)?,
        }
        self.polarization_array = self.polarization_array.collapsed();
        self.history.record("Pol axis collapse.");
        Ok(())
    }
}

fn metric_with_weights<D: Dimension>(weights: Array<f64, D>) -> Values<D> {
    Values::Metric {
        metric: Array::zeros(weights.raw_dim()),
        weights,
        weights_square: None,
    }
}

/// Weights for each polarisation of a 3D flag array, treating the first two
/// axes as a plane.
fn plane_weights(flags: ArrayView3<bool>) -> Array3<f64> {
    let mut weights = Array3::ones(flags.raw_dim());
    for (mut w, f) in weights
        .axis_iter_mut(Axis(2))
        .zip(flags.axis_iter(Axis(2)))
    {
        w.assign(&weights_from_flags(f));
    }
    weights
}

fn values_dim(values: &Values<Ix3>) -> (usize, usize, usize) {
    match values {
        Values::Metric { metric, .. } => metric.dim(),
        Values::Flag(f) => f.dim(),
    }
}

/// Stack 2D values (one per time) into 3D values.
fn stack_planes(
    parts: &[Values<Ix2>],
    (nfreqs, npols): (usize, usize),
    mode: FlagMode,
) -> Result<Values<Ix3>, FlagError> {
    if parts.is_empty() {
        return Ok(match mode {
            FlagMode::Metric => Values::new_metric((0, nfreqs, npols)),
            FlagMode::Flag => Values::new_flag((0, nfreqs, npols)),
        });
    }

    match mode {
        FlagMode::Metric => {
            let metric = stack_f64(parts, |v| match v {
                Values::Metric { metric, .. } => Some(metric.view()),
                Values::Flag(_) => None,
            })?;
            let weights = stack_f64(parts, |v| match v {
                Values::Metric { weights, .. } => Some(weights.view()),
                Values::Flag(_) => None,
            })?;
            let weights_square = stack_f64(parts, |v| match v {
                Values::Metric {
                    weights_square: Some(ws),
                    ..
                } => Some(ws.view()),
                _ => None,
            })?;
            match (metric, weights) {
                (Some(metric), Some(weights)) => Ok(Values::Metric {
                    metric,
                    weights,
                    weights_square,
                }),
                _ => Err(FlagError::ModeMismatch {
                    this: FlagMode::Metric,
                    other: FlagMode::Flag,
                }),
            }
        }
        FlagMode::Flag => {
            let views: Vec<ArrayView2<bool>> = parts
                .iter()
                .filter_map(|v| match v {
                    Values::Flag(f) => Some(f.view()),
                    Values::Metric { .. } => None,
                })
                .collect();
            Ok(Values::Flag(ndarray::stack(Axis(0), &views)?))
        }
    }
}

fn stack_f64<'a>(
    parts: &'a [Values<Ix2>],
    pick: impl Fn(&'a Values<Ix2>) -> Option<ArrayView2<'a, f64>>,
) -> Result<Option<Array3<f64>>, FlagError> {
    let views: Option<Vec<ArrayView2<f64>>> = parts.iter().map(pick).collect();
    match views {
        Some(views) => Ok(Some(ndarray::stack(Axis(0), &views)?)),
        None => Ok(None),
    }
}
