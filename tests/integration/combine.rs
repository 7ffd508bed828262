// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use crate::{get_cmd_output, get_flags, hyperflag, num_flagged, tmp_file, write_flags, TIMES};
use mwa_hyperflag::{FlagMode, FlagSet, Polarizations};

#[test]
fn test_combine_time_split_files() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let first = tmp_file(&dir, "part_0.fits");
    let second = tmp_file(&dir, "part_1.fits");
    let output = tmp_file(&dir, "combined.fits");
    write_flags(&first, &TIMES[..1], &[[0, 0, 0]]);
    write_flags(&second, &TIMES[1..], &[[2, 3, 1]]);

    // The inputs can be a glob; the axis is detected.
    let glob = dir.path().join("part_*.fits");
    let cmd = hyperflag()
        .args([
            "combine",
            &glob.display().to_string(),
            "-o",
            &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let combined = FlagSet::read(&output).unwrap();
    assert_eq!(combined.ntimes(), 2);
    assert_eq!(combined.nblts(), Some(6));
    let f = combined.flag_array().unwrap();
    assert!(f[[0, 0, 0]]);
    assert!(f[[5, 3, 1]]);
    assert_eq!(num_flagged(&combined), 2);
}

#[test]
fn test_combine_with_explicit_axis() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let first = tmp_file(&dir, "a.fits");
    let second = tmp_file(&dir, "b.fits");
    let output = tmp_file(&dir, "combined.fits");
    write_flags(&first, &TIMES, &[]);
    let mut flags = get_flags(&TIMES);
    flags.polarization_array = Polarizations::Codes(vec![-7, -8]);
    flags.write(&second, false).unwrap();

    let cmd = hyperflag()
        .args([
            "add",
            &first.display().to_string(),
            &second.display().to_string(),
            "-o",
            &output.display().to_string(),
            "--axis",
            "polarization",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let combined = FlagSet::read(&output).unwrap();
    assert_eq!(
        combined.polarization_array.codes(),
        Some([-5, -6, -7, -8].as_slice())
    );
}

#[test]
fn test_combine_rms() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let first = tmp_file(&dir, "a.fits");
    let second = tmp_file(&dir, "b.fits");
    let output = tmp_file(&dir, "rms.fits");
    for (path, value) in [(&first, 3.0), (&second, 4.0)] {
        let mut flags = get_flags(&TIMES);
        flags.to_metric(false);
        flags.metric_array_mut().unwrap().fill(value);
        flags.write(path, false).unwrap();
    }

    let cmd = hyperflag()
        .args([
            "combine",
            &first.display().to_string(),
            &second.display().to_string(),
            "-o",
            &output.display().to_string(),
            "--rms",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let rms = FlagSet::read(&output).unwrap();
    assert_eq!(rms.mode(), FlagMode::Metric);
    let expected = (12.5_f64).sqrt();
    for &m in rms.metric_array().unwrap() {
        assert_abs_diff_eq!(m, expected, epsilon = 1e-10);
    }
}

#[test]
fn test_combine_needs_two_files() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let first = tmp_file(&dir, "a.fits");
    let output = tmp_file(&dir, "combined.fits");
    write_flags(&first, &TIMES, &[]);

    let cmd = hyperflag()
        .args([
            "combine",
            &first.display().to_string(),
            "-o",
            &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("At least 2 input files"), "{stderr}");
}

#[test]
fn test_or() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let first = tmp_file(&dir, "a.fits");
    let second = tmp_file(&dir, "b.fits");
    let output = tmp_file(&dir, "or.fits");
    write_flags(&first, &TIMES, &[[0, 0, 0], [1, 1, 1]]);
    write_flags(&second, &TIMES, &[[1, 1, 1], [4, 2, 0]]);

    let cmd = hyperflag()
        .args([
            "or",
            &first.display().to_string(),
            &second.display().to_string(),
            "-o",
            &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let or = FlagSet::read(&output).unwrap();
    let f = or.flag_array().unwrap();
    assert!(f[[0, 0, 0]]);
    assert!(f[[1, 1, 1]]);
    assert!(f[[4, 2, 0]]);
    assert_eq!(num_flagged(&or), 3);
}
