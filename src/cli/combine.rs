// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Combine many flag files into one.

use std::path::PathBuf;

use clap::Parser;
use log::{debug, info};
use vec1::Vec1;

use super::{expand_at_least, write_output, CliArgsError, HyperflagError};
use crate::flags::{FlagAxis, FlagSet};

#[derive(Parser, Debug)]
pub(super) struct CombineArgs {
    /// Paths to the flag files to combine, in order. Globs are expanded.
    #[clap(name = "FLAG_FILES", parse(from_str), required = true)]
    files: Vec<String>,

    /// Path to the output flag file.
    #[clap(short, long, parse(from_os_str))]
    output: PathBuf,

    /// The axis to combine along. One of time, baseline, antenna, frequency,
    /// polarization. If this isn't given, it's detected from the first
    /// coordinate that differs between files.
    #[clap(long)]
    axis: Option<String>,

    /// Instead of concatenating, replace the metric with the root-mean-square
    /// of the metrics of all files. All files must have the same shape.
    #[clap(long)]
    rms: bool,

    /// Overwrite the output file if it exists.
    #[clap(long)]
    clobber: bool,
}

impl CombineArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), HyperflagError> {
        if self.rms && self.axis.is_some() {
            return Err(CliArgsError::AxisWithRms.into());
        }
        let axis = self.axis.as_deref().map(FlagAxis::from_input).transpose()?;
        let files = expand_at_least(&self.files, 2)?;
        info!("Combining {} flag files", files.len());
        for f in &files {
            debug!("  {}", f.display());
        }

        let mut flags = if self.rms {
            let (first, rest) = (files.first(), &files[1..]);
            let first = FlagSet::read(first)?;
            let others = rest
                .iter()
                .map(FlagSet::read)
                .collect::<Result<Vec<_>, _>>()?;
            let others = Vec1::try_from_vec(others.iter().collect())
                .map_err(|_| CliArgsError::TooFewInputs { expected: 2, got: 1 })?;
            first.combine_metrics(&others)?
        } else if let Some(axis) = axis {
            let (first, rest) = (files.first(), &files[1..]);
            let mut flags = FlagSet::read(first)?;
            for file in rest {
                flags.add_inplace(&FlagSet::read(file)?, Some(axis))?;
            }
            flags
        } else {
            FlagSet::read_many(&files)?
        };

        info!(
            "Result has {} times, {} frequencies and {} polarisations",
            flags.ntimes(),
            flags.nfreqs(),
            flags.npols()
        );
        write_output(&mut flags, &self.output, self.clobber, dry_run)
    }
}
