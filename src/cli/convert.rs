// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Convert flag files between types and modes.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use super::{read_single_input, write_output, CliArgsError, HyperflagError};
use crate::flags::{CollapseMethod, FlagMode};

#[derive(Parser, Debug)]
pub(super) struct ConvertArgs {
    /// Path to the input flag file.
    #[clap(name = "INPUT_FILE", parse(from_str))]
    input: String,

    /// Path to the output flag file.
    #[clap(name = "OUTPUT_FILE", parse(from_os_str))]
    output: PathBuf,

    /// Collapse the baseline or antenna axis, leaving a waterfall.
    #[clap(long)]
    to_waterfall: bool,

    /// Also collapse the polarisation axis.
    #[clap(long)]
    collapse_pol: bool,

    /// The method used for collapsing. One of mean, absmean, quadmean, or,
    /// and. The default is "or" for flags and "quadmean" for metrics.
    #[clap(long)]
    method: Option<String>,

    /// Keep the sum of squared weights when collapsing metrics.
    #[clap(long)]
    weights_square: bool,

    /// Convert metrics to flags, flagging anything above this threshold.
    #[clap(long, value_name = "THRESHOLD")]
    to_flag: Option<f64>,

    /// Convert flags to metrics.
    #[clap(long)]
    to_metric: bool,

    /// Overwrite the output file if it exists.
    #[clap(long)]
    clobber: bool,
}

impl ConvertArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), HyperflagError> {
        if self.to_flag.is_some() && self.to_metric {
            return Err(CliArgsError::ConflictingModes.into());
        }

        let mut flags = read_single_input(&self.input)?;
        let method = match &self.method {
            Some(m) => CollapseMethod::from_input(m)?,
            None if flags.mode() == FlagMode::Flag => CollapseMethod::Or,
            None => CollapseMethod::QuadMean,
        };

        if self.to_waterfall {
            info!("Collapsing to a waterfall with method {method}");
            flags.to_waterfall(method, !self.collapse_pol, self.weights_square)?;
        } else if self.collapse_pol {
            info!("Collapsing polarisations with method {method}");
            flags.collapse_pol(method)?;
        }

        if let Some(threshold) = self.to_flag {
            info!("Converting to flags with threshold {threshold}");
            flags.to_flag(Some(threshold));
        } else if self.to_metric {
            info!("Converting to metrics");
            flags.to_metric(true);
        }

        info!(
            "Result is a {} type {} mode object",
            flags.flag_type(),
            flags.mode()
        );
        write_output(&mut flags, &self.output, self.clobber, dry_run)
    }
}
