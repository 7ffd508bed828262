// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::{get_cmd_output, hyperflag, num_flagged, tmp_file, write_flags, NUM_FREQS, TIMES};
use mwa_hyperflag::FlagSet;

#[test]
fn test_select_antennas() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    let output = tmp_file(&dir, "sel.fits");
    // Rows 0 and 3 are baseline (0, 1).
    write_flags(&input, &TIMES, &[[0, 0, 0], [3, 1, 1], [1, 0, 0]]);

    let cmd = hyperflag()
        .args([
            "select",
            &input.display().to_string(),
            &output.display().to_string(),
            "--antennas",
            "0",
            "1",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let sel = FlagSet::read(&output).unwrap();
    assert_eq!(sel.nbls(), Some(1));
    assert_eq!(sel.nblts(), Some(2));
    assert_eq!(sel.get_antpairs().unwrap(), vec![(0, 1)]);
    let f = sel.flag_array().unwrap();
    assert!(f[[0, 0, 0]]);
    assert!(f[[1, 1, 1]]);
    assert_eq!(num_flagged(&sel), 2);
}

#[test]
fn test_select_invert_pols_and_chans() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    let output = tmp_file(&dir, "sel.fits");
    write_flags(&input, &TIMES, &[]);

    let cmd = hyperflag()
        .args([
            "select",
            &input.display().to_string(),
            &output.display().to_string(),
            "--pols",
            "-5",
            "--freq-chans",
            "0",
            "1",
            "--invert",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let sel = FlagSet::read(&output).unwrap();
    assert_eq!(sel.polarization_array.codes(), Some([-6].as_slice()));
    assert_eq!(sel.nfreqs(), NUM_FREQS - 2);
    assert_eq!(sel.nblts(), Some(6));
}

#[test]
fn test_select_ant_str() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    let output = tmp_file(&dir, "sel.fits");
    write_flags(&input, &TIMES, &[]);

    let cmd = hyperflag()
        .args([
            "select",
            &input.display().to_string(),
            &output.display().to_string(),
            "--ant-str",
            "1_2",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let sel = FlagSet::read(&output).unwrap();
    assert_eq!(sel.get_antpairs().unwrap(), vec![(1, 2)]);
    assert_eq!(sel.ntimes(), 2);
}

#[test]
fn test_select_strict_missing_time() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    let output = tmp_file(&dir, "sel.fits");
    write_flags(&input, &TIMES, &[]);

    let cmd = hyperflag()
        .args([
            "select",
            &input.display().to_string(),
            &output.display().to_string(),
            "--times",
            "2450000.5",
            "--strict",
        ])
        .ok();
    assert!(cmd.is_err());
    assert!(!output.exists());
}
