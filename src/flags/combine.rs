// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Element-wise combination of flag objects with identical shapes.

use log::debug;
use ndarray::{ArrayViewD, ArrayViewMutD, Zip};
use vec1::Vec1;

use super::{FlagError, FlagMode, FlagSet};

impl FlagSet {
    /// OR the flags of another object into a copy of this one.
    pub fn or(&self, other: &FlagSet) -> Result<FlagSet, FlagError> {
        let mut out = self.clone();
        out.or_inplace(other)?;
        Ok(out)
    }

    /// OR the flags of another object into this one. Both objects must be in
    /// flag mode with the same shape; nothing else is compared.
    pub fn or_inplace(&mut self, other: &FlagSet) -> Result<(), FlagError> {
        if self.mode() != FlagMode::Flag || other.mode() != FlagMode::Flag {
            return Err(FlagError::OrNeedsFlagMode);
        }
        let other_flags = other.flag_array().ok_or(FlagError::OrNeedsFlagMode)?;
        let flags = self.flag_array_mut().ok_or(FlagError::OrNeedsFlagMode)?;
        or_into(flags, other_flags)?;

        self.history.push("Flags OR'd with:");
        self.history.extend(&other.history);
        self.history.add_version();
        Ok(())
    }

    /// Combine the metrics of this object and others into a new object. See
    /// [`FlagSet::combine_metrics_inplace`].
    pub fn combine_metrics(&self, others: &Vec1<&FlagSet>) -> Result<FlagSet, FlagError> {
        let mut out = self.clone();
        out.combine_metrics_inplace(others)?;
        Ok(out)
    }

    /// Replace this object's metric with the root-mean-square of its metric
    /// and those of the others. Every object must be in metric mode with the
    /// same shape. Weights are untouched.
    pub fn combine_metrics_inplace(&mut self, others: &Vec1<&FlagSet>) -> Result<(), FlagError> {
        if self.mode() != FlagMode::Metric || others.iter().any(|o| o.mode() != FlagMode::Metric)
        {
            return Err(FlagError::CombineNeedsMetricMode);
        }
        let other_metrics = others
            .iter()
            .map(|o| o.metric_array().ok_or(FlagError::CombineNeedsMetricMode))
            .collect::<Result<Vec<_>, _>>()?;
        let mut metric = self
            .metric_array_mut()
            .ok_or(FlagError::CombineNeedsMetricMode)?;
        if other_metrics.iter().any(|m| m.shape() != metric.shape()) {
            return Err(FlagError::MetricShapeMismatch);
        }

        let n = (other_metrics.len() + 1) as f64;
        debug!("Combining the metrics of {n} flag objects");
        metric.mapv_inplace(|m| m * m);
        for other in &other_metrics {
            Zip::from(&mut metric)
                .and(other)
                .for_each(|m, &o| *m += o * o);
        }
        metric.mapv_inplace(|m| (m / n).sqrt());

        self.history.record("Combined metric arrays.");
        Ok(())
    }
}

fn or_into(mut flags: ArrayViewMutD<bool>, other: ArrayViewD<bool>) -> Result<(), FlagError> {
    if flags.shape() != other.shape() {
        return Err(FlagError::FlagShapeMismatch);
    }
    Zip::from(&mut flags).and(&other).for_each(|f, &o| *f |= o);
    Ok(())
}

impl std::ops::BitOr for &FlagSet {
    type Output = Result<FlagSet, FlagError>;

    fn bitor(self, other: &FlagSet) -> Self::Output {
        self.or(other)
    }
}
