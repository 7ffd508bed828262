// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The data arrays of a flag object. Exactly one of a metric (with weights) or
//! a flag array exists at any time.

use ndarray::{prelude::*, RemoveAxis, Zip};

use super::{CollapseMethod, FlagError, FlagMode};
use crate::{
    constants::METRIC_TOL,
    math::{and_rows_cols, arrays_close},
};

#[derive(Debug, Clone)]
pub enum Values<D: Dimension> {
    Metric {
        metric: Array<f64, D>,
        weights: Array<f64, D>,
        /// The sum of squared weights, only present after a collapse that
        /// asked for it.
        weights_square: Option<Array<f64, D>>,
    },
    Flag(Array<bool, D>),
}

impl<D: Dimension> Values<D> {
    /// Zero metrics with unit weights.
    pub fn new_metric<Sh: ShapeBuilder<Dim = D> + Clone>(shape: Sh) -> Values<D> {
        Values::Metric {
            metric: Array::zeros(shape.clone()),
            weights: Array::ones(shape),
            weights_square: None,
        }
    }

    /// Nothing flagged.
    pub fn new_flag<Sh: ShapeBuilder<Dim = D>>(shape: Sh) -> Values<D> {
        Values::Flag(Array::from_elem(shape, false))
    }

    pub fn mode(&self) -> FlagMode {
        match self {
            Values::Metric { .. } => FlagMode::Metric,
            Values::Flag(_) => FlagMode::Flag,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Values::Metric { metric, .. } => metric.shape(),
            Values::Flag(f) => f.shape(),
        }
    }

    pub fn has_weights_square(&self) -> bool {
        matches!(
            self,
            Values::Metric {
                weights_square: Some(_),
                ..
            }
        )
    }

    /// Apply one function to every float array and another to the flag
    /// array.
    pub(crate) fn map<E: Dimension>(
        &self,
        f: impl Fn(ArrayView<f64, D>) -> Array<f64, E>,
        g: impl Fn(ArrayView<bool, D>) -> Array<bool, E>,
    ) -> Values<E> {
        match self {
            Values::Metric {
                metric,
                weights,
                weights_square,
            } => Values::Metric {
                metric: f(metric.view()),
                weights: f(weights.view()),
                weights_square: weights_square.as_ref().map(|ws| f(ws.view())),
            },
            Values::Flag(flags) => Values::Flag(g(flags.view())),
        }
    }

    /// The same as [`Values::map`], but the functions can fail.
    pub(crate) fn try_map<E: Dimension>(
        &self,
        f: impl Fn(ArrayView<f64, D>) -> Result<Array<f64, E>, FlagError>,
        g: impl Fn(ArrayView<bool, D>) -> Result<Array<bool, E>, FlagError>,
    ) -> Result<Values<E>, FlagError> {
        Ok(match self {
            Values::Metric {
                metric,
                weights,
                weights_square,
            } => Values::Metric {
                metric: f(metric.view())?,
                weights: f(weights.view())?,
                weights_square: weights_square.as_ref().map(|ws| f(ws.view())).transpose()?,
            },
            Values::Flag(flags) => Values::Flag(g(flags.view())?),
        })
    }

    /// Keep only the supplied indices along an axis.
    pub(crate) fn select(&self, axis: Axis, indices: &[usize]) -> Values<D>
    where
        D: RemoveAxis,
    {
        self.map(|a| a.select(axis, indices), |a| a.select(axis, indices))
    }

    /// Join two sets of values along an axis. The caller must have checked
    /// that the modes and the presence of weights-square arrays agree.
    pub(crate) fn concatenate(&self, other: &Values<D>, axis: Axis) -> Result<Values<D>, FlagError>
    where
        D: RemoveAxis,
    {
        match (self, other) {
            (
                Values::Metric {
                    metric: m1,
                    weights: w1,
                    weights_square: ws1,
                },
                Values::Metric {
                    metric: m2,
                    weights: w2,
                    weights_square: ws2,
                },
            ) => {
                let weights_square = match (ws1, ws2) {
                    (Some(ws1), Some(ws2)) => {
                        Some(ndarray::concatenate(axis, &[ws1.view(), ws2.view()])?)
                    }
                    _ => None,
                };
                Ok(Values::Metric {
                    metric: ndarray::concatenate(axis, &[m1.view(), m2.view()])?,
                    weights: ndarray::concatenate(axis, &[w1.view(), w2.view()])?,
                    weights_square,
                })
            }
            (Values::Flag(f1), Values::Flag(f2)) => Ok(Values::Flag(ndarray::concatenate(
                axis,
                &[f1.view(), f2.view()],
            )?)),
            _ => Err(FlagError::ModeMismatch {
                this: self.mode(),
                other: other.mode(),
            }),
        }
    }

    /// Convert metrics to flags. Anything above the threshold is flagged.
    pub(crate) fn to_flag(&self, threshold: f64) -> Values<D> {
        match self {
            Values::Metric { metric, .. } => Values::Flag(metric.mapv(|m| m > threshold)),
            Values::Flag(f) => Values::Flag(f.clone()),
        }
    }

    /// Compare two sets of values within the metric tolerance.
    pub(crate) fn close_to(&self, other: &Values<D>) -> bool {
        match (self, other) {
            (
                Values::Metric {
                    metric: m1,
                    weights: w1,
                    weights_square: ws1,
                },
                Values::Metric {
                    metric: m2,
                    weights: w2,
                    weights_square: ws2,
                },
            ) => {
                arrays_close(m1.view(), m2.view(), METRIC_TOL)
                    && arrays_close(w1.view(), w2.view(), METRIC_TOL)
                    && match (ws1, ws2) {
                        (Some(a), Some(b)) => arrays_close(a.view(), b.view(), METRIC_TOL),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (Values::Flag(f1), Values::Flag(f2)) => f1 == f2,
            _ => false,
        }
    }
}

/// Collapse values along an axis.
///
/// Metrics are combined as a weighted mean (of the values, their magnitudes or
/// their squares, depending on the method). The output weights are the sums
/// of the weights and, if requested, the output also carries the sums of the
/// squared weights. Elements with no weight get a metric of 0.
///
/// Flags may only be collapsed with a logical method; callers convert flags
/// to metrics for the other methods.
pub(crate) fn collapse<D: Dimension + RemoveAxis>(
    values: &Values<D>,
    axis: Axis,
    method: CollapseMethod,
    return_weights_square: bool,
) -> Result<Values<D::Smaller>, FlagError> {
    match values {
        Values::Metric {
            metric,
            weights,
            weights_square,
        } => {
            if method.is_logical() {
                return Err(FlagError::LogicalCollapseOnMetric(method));
            }
            let collapsed = Zip::from(metric.lanes(axis))
                .and(weights.lanes(axis))
                .map_collect(|m, w| {
                    let w_sum = w.sum();
                    let m_sum: f64 = m
                        .iter()
                        .zip(w.iter())
                        .map(|(&m, &w)| match method {
                            CollapseMethod::Mean => w * m,
                            CollapseMethod::AbsMean => w * m.abs(),
                            _ => w * m * m,
                        })
                        .sum();
                    let mean = if w_sum == 0.0 { 0.0 } else { m_sum / w_sum };
                    let mean = match method {
                        CollapseMethod::QuadMean => mean.sqrt(),
                        _ => mean,
                    };
                    (mean, w_sum)
                });
            let weights_square = match weights_square {
                Some(ws) => Some(ws.sum_axis(axis)),
                None if return_weights_square => {
                    Some(weights.mapv(|w| w * w).sum_axis(axis))
                }
                None => None,
            };
            Ok(Values::Metric {
                metric: collapsed.mapv(|(m, _)| m),
                weights: collapsed.mapv(|(_, w)| w),
                weights_square,
            })
        }

        Values::Flag(flags) => {
            let reduced = match method {
                CollapseMethod::Or => flags.map_axis(axis, |lane| lane.iter().any(|&f| f)),
                CollapseMethod::And => flags.map_axis(axis, |lane| lane.iter().all(|&f| f)),
                _ => {
                    return Err(FlagError::NotImplemented(format!(
                        "Flags must be converted to metrics before a {method} collapse."
                    )))
                }
            };
            Ok(Values::Flag(reduced))
        }
    }
}

/// Collapse the last axis of values, keeping it with length 1.
pub(crate) fn collapse_last_axis<D: Dimension + RemoveAxis>(
    values: &Values<D>,
    method: CollapseMethod,
) -> Result<Values<D>, FlagError> {
    let last = Axis(values.shape().len() - 1);
    let collapsed = collapse(values, last, method, false)?;
    collapsed.try_map(
        |a| Ok(a.insert_axis(last).into_dimensionality::<D>()?.to_owned()),
        |a| Ok(a.insert_axis(last).into_dimensionality::<D>()?.to_owned()),
    )
}

/// Get weights from flags. The weights are 1, except where the flags are
/// entirely set along a whole row or column of a 2D plane; those are 0.
pub(crate) fn weights_from_flags(flags: ArrayView2<bool>) -> Array2<f64> {
    and_rows_cols(flags).mapv(|f| if f { 0.0 } else { 1.0 })
}
