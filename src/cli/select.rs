// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Select a subset of a flag file.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use super::{read_single_input, write_output, HyperflagError};
use crate::flags::{PolSelection, SelectCriteria};

#[derive(Parser, Debug)]
pub(super) struct SelectArgs {
    /// Path to the input flag file.
    #[clap(name = "INPUT_FILE", parse(from_str))]
    input: String,

    /// Path to the output flag file.
    #[clap(name = "OUTPUT_FILE", parse(from_os_str))]
    output: PathBuf,

    /// The antenna numbers to keep. For baseline-type files, a baseline is
    /// kept if both of its antennas are listed.
    #[clap(long, multiple_values(true))]
    antennas: Option<Vec<u32>>,

    /// The times (Julian dates) to keep.
    #[clap(long, multiple_values(true))]
    times: Option<Vec<f64>>,

    /// The frequencies \[Hz\] to keep.
    #[clap(long, multiple_values(true))]
    freqs: Option<Vec<f64>>,

    /// The indices of the frequency channels to keep.
    #[clap(long, multiple_values(true))]
    freq_chans: Option<Vec<usize>>,

    /// The polarisations to keep, either as codes (e.g. -5) or names (e.g.
    /// xx).
    #[clap(long, multiple_values(true), allow_hyphen_values(true))]
    pols: Option<Vec<String>>,

    /// An antenna string, e.g. "1_2,3x_4y" or "cross". Can't be used with
    /// --antennas or --pols.
    #[clap(long)]
    ant_str: Option<String>,

    /// Remove the selected data instead of keeping it.
    #[clap(long)]
    invert: bool,

    /// Fail if any of the requested values aren't in the file, instead of
    /// warning about them.
    #[clap(long)]
    strict: bool,

    /// Overwrite the output file if it exists.
    #[clap(long)]
    clobber: bool,
}

impl SelectArgs {
    fn criteria(&self) -> SelectCriteria {
        let mut criteria = SelectCriteria::new()
            .invert(self.invert)
            .strict(Some(self.strict));
        if let Some(antennas) = &self.antennas {
            criteria = criteria.antenna_nums(antennas.clone());
        }
        if let Some(times) = &self.times {
            criteria = criteria.times(times.clone());
        }
        if let Some(freqs) = &self.freqs {
            criteria = criteria.frequencies(freqs.clone());
        }
        if let Some(chans) = &self.freq_chans {
            criteria = criteria.freq_chans(chans.clone());
        }
        if let Some(pols) = &self.pols {
            criteria = criteria.polarizations(
                pols.iter()
                    .map(|p| match p.parse::<i32>() {
                        Ok(code) => PolSelection::Code(code),
                        Err(_) => PolSelection::Name(p.clone()),
                    })
                    .collect::<Vec<PolSelection>>(),
            );
        }
        if let Some(ant_str) = &self.ant_str {
            criteria = criteria.ant_str(ant_str.as_str());
        }
        criteria
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), HyperflagError> {
        let flags = read_single_input(&self.input)?;
        let mut selected = flags.select(&self.criteria())?;
        info!(
            "Selected {} of {} times, {} of {} frequencies and {} of {} polarisations",
            selected.ntimes(),
            flags.ntimes(),
            selected.nfreqs(),
            flags.nfreqs(),
            selected.npols(),
            flags.npols()
        );
        if let (Some(before), Some(after)) = (flags.nblts(), selected.nblts()) {
            info!("Kept {after} of {before} baseline-times");
        }
        write_output(&mut selected, &self.output, self.clobber, dry_run)
    }
}
