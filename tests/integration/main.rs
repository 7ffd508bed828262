// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod combine;
mod convert;
mod select;

use std::path::{Path, PathBuf};
use std::process::Output;
use std::str::from_utf8;

use assert_cmd::{output::OutputError, Command};
use hifitime::Duration;
use itertools::Itertools;
use tempfile::TempDir;

use mwa_hyperflag::{
    antnums_to_baseline, lst::get_lsts, FlagMode, FlagSet, FlagSetOptions, Telescope,
    VisibilityData,
};

const NUM_ANTS: u32 = 3;
const NUM_FREQS: usize = 4;

fn hyperflag() -> Command {
    Command::cargo_bin("hyperflag").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// Unflagged, flag-mode, baseline-type flags for the 3 cross-correlation
/// baselines of 3 antennas, at the given times.
fn get_flags(times: &[f64]) -> FlagSet {
    let telescope = Telescope {
        antenna_numbers: Some((0..NUM_ANTS).collect()),
        ..Telescope::from_known("MWA").unwrap()
    };
    let antpairs = (0..NUM_ANTS).tuple_combinations::<(u32, u32)>().collect::<Vec<_>>();
    let mut time_array = vec![];
    let mut ant_1_array = vec![];
    let mut ant_2_array = vec![];
    for &t in times {
        for &(a1, a2) in &antpairs {
            time_array.push(t);
            ant_1_array.push(a1);
            ant_2_array.push(a2);
        }
    }
    let baseline_array = ant_1_array
        .iter()
        .zip(&ant_2_array)
        .map(|(&a1, &a2)| antnums_to_baseline(a1, a2, NUM_ANTS as usize))
        .collect();
    let lst_array = get_lsts(
        &time_array,
        telescope.location.unwrap().longitude_rad,
        Duration::from_seconds(0.0),
    );
    let vis = VisibilityData {
        telescope,
        time_array,
        lst_array,
        ant_1_array,
        ant_2_array,
        baseline_array,
        freq_array: (0..NUM_FREQS).map(|i| 182e6 + i as f64 * 40e3).collect(),
        channel_width: vec![40e3; NUM_FREQS],
        spw_array: vec![0],
        flex_spw_id_array: vec![0; NUM_FREQS],
        polarization_array: vec![-5, -6],
        history: "Integration test flags.".to_string(),
        ..Default::default()
    };
    FlagSet::from_visibility(
        &vis,
        &FlagSetOptions {
            mode: FlagMode::Flag,
            ..Default::default()
        },
    )
    .unwrap()
}

const TIMES: [f64; 2] = [2459000.5, 2459000.5 + 2.0 / 86400.0];

/// Write flags with the given (row, freq, pol) values flagged.
fn write_flags(path: &Path, times: &[f64], flagged: &[[usize; 3]]) -> FlagSet {
    let mut flags = get_flags(times);
    {
        let mut f = flags.flag_array_mut().unwrap();
        for &i in flagged {
            f[i] = true;
        }
    }
    flags.write(path, false).unwrap();
    flags
}

fn num_flagged(flags: &FlagSet) -> usize {
    flags.flag_array().unwrap().iter().filter(|&&f| f).count()
}

fn tmp_file(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

#[test]
fn test_no_args_prints_help() {
    let (_, stderr) = get_cmd_output(hyperflag().ok());
    assert!(stderr.contains("USAGE"), "{stderr}");
}

#[test]
fn test_info() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    write_flags(&input, &TIMES, &[[0, 0, 0], [1, 2, 1]]);

    let cmd = hyperflag()
        .args(["info", &input.display().to_string(), "--history"])
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stdout}\n{stderr}");
    assert!(stdout.contains("Type: baseline, mode: flag"), "{stdout}");
    assert!(stdout.contains("Nblts: 6, Nbls: 3"), "{stdout}");
    assert!(stdout.contains("Polarisations: xx, yy"), "{stdout}");
    assert!(stdout.contains("Flagged: 2 / 48"), "{stdout}");
    assert!(stdout.contains("Integration test flags."), "{stdout}");
}

#[test]
fn test_missing_input() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "nothing.fits");
    let cmd = hyperflag()
        .args(["info", &input.display().to_string()])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("not found"), "{stderr}");
}
