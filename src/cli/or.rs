// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! OR the flags of many flag files.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use super::{expand_at_least, write_output, HyperflagError};
use crate::flags::FlagSet;

#[derive(Parser, Debug)]
pub(super) struct OrArgs {
    /// Paths to the flag files. All must be in flag mode with the same shape.
    /// Globs are expanded.
    #[clap(name = "FLAG_FILES", parse(from_str), required = true)]
    files: Vec<String>,

    /// Path to the output flag file.
    #[clap(short, long, parse(from_os_str))]
    output: PathBuf,

    /// Overwrite the output file if it exists.
    #[clap(long)]
    clobber: bool,
}

impl OrArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), HyperflagError> {
        let files = expand_at_least(&self.files, 2)?;
        let (first, rest) = (files.first(), &files[1..]);
        let mut flags = FlagSet::read(first)?;
        for file in rest {
            flags.or_inplace(&FlagSet::read(file)?)?;
        }

        if let Some(f) = flags.flag_array() {
            let flagged = f.iter().filter(|&&f| f).count();
            info!("{flagged} of {} values are flagged", f.len());
        }
        write_output(&mut flags, &self.output, self.clobber, dry_run)
    }
}
