// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Print information on flag files.

use clap::Parser;
use log::info;

use super::{expand_at_least, HyperflagError};
use crate::flags::{FlagData, FlagSet};

#[derive(Parser, Debug)]
pub(super) struct InfoArgs {
    /// Paths to the flag files. Globs are expanded.
    #[clap(name = "FLAG_FILES", parse(from_str), required = true)]
    files: Vec<String>,

    /// Also print the history of each file.
    #[clap(long)]
    history: bool,
}

impl InfoArgs {
    pub(super) fn run(self) -> Result<(), HyperflagError> {
        for file in expand_at_least(&self.files, 1)? {
            let flags = FlagSet::read(&file)?;
            info!("{}:", file.display());
            print_summary(&flags, self.history);
        }
        Ok(())
    }
}

fn print_summary(flags: &FlagSet, history: bool) {
    info!("  Type: {}, mode: {}", flags.flag_type(), flags.mode());
    if !flags.label.is_empty() {
        info!("  Label: {}", flags.label);
    }
    if let Some(name) = &flags.telescope.name {
        info!("  Telescope: {name}");
    }
    info!("  Ntimes: {}", flags.ntimes());
    match &flags.data {
        FlagData::Baseline { .. } => {
            info!(
                "  Nblts: {}, Nbls: {}",
                flags.nblts().unwrap_or(0),
                flags.nbls().unwrap_or(0)
            );
        }
        FlagData::Antenna { .. } => {
            info!("  Nants_data: {}", flags.nants_data().unwrap_or(0));
        }
        FlagData::Waterfall { .. } => (),
    }
    info!("  Nfreqs: {}, Nspws: {}", flags.nfreqs(), flags.nspws());
    if let (Some(first), Some(last)) = (flags.freq_array.first(), flags.freq_array.last()) {
        info!("  Frequencies: {:.3} to {:.3} MHz", first / 1e6, last / 1e6);
    }
    info!(
        "  Polarisations: {}",
        flags.polarization_array.names().join(", ")
    );

    if let Some(f) = flags.flag_array() {
        let total = f.len();
        let flagged = f.iter().filter(|&&f| f).count();
        let percent = if total == 0 {
            0.0
        } else {
            100.0 * flagged as f64 / total as f64
        };
        info!("  Flagged: {flagged} / {total} ({percent:.2}%)");
    }
    if let Some(m) = flags.metric_array() {
        let max = m.iter().copied().fold(f64::NAN, f64::max);
        info!("  Mean metric: {:.4}, max: {max:.4}", m.mean().unwrap_or(f64::NAN));
    }

    if history {
        info!("  History:");
        for entry in flags.history.entries() {
            info!("    {entry}");
        }
    }
}
