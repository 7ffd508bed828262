// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use crate::{
    get_cmd_output, get_flags, hyperflag, num_flagged, tmp_file, write_flags, NUM_FREQS, TIMES,
};
use mwa_hyperflag::{FlagMode, FlagSet, FlagType};

#[test]
fn test_convert_to_waterfall() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    let output = tmp_file(&dir, "wf.fits");
    // Time 0, baseline (0, 1), channel 1, both pols; time 1, baseline (1, 2),
    // channel 3, yy.
    write_flags(&input, &TIMES, &[[0, 1, 0], [0, 1, 1], [5, 3, 1]]);

    let cmd = hyperflag()
        .args([
            "convert",
            &input.display().to_string(),
            &output.display().to_string(),
            "--to-waterfall",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let wf = FlagSet::read(&output).unwrap();
    assert_eq!(wf.flag_type(), FlagType::Waterfall);
    // Flags are combined with "or" unless told otherwise.
    assert_eq!(wf.mode(), FlagMode::Flag);
    assert_eq!(wf.ntimes(), 2);
    let f = wf.flag_array().unwrap();
    assert_eq!(f.shape(), &[2, NUM_FREQS, 2]);
    assert!(f[[0, 1, 0]]);
    assert!(f[[0, 1, 1]]);
    assert!(f[[1, 3, 1]]);
    assert_eq!(num_flagged(&wf), 3);
}

#[test]
fn test_convert_to_metric() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    let output = tmp_file(&dir, "metric.fits");
    write_flags(&input, &TIMES, &[[0, 2, 0]]);

    let cmd = hyperflag()
        .args([
            "convert",
            &input.display().to_string(),
            &output.display().to_string(),
            "--to-metric",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let m = FlagSet::read(&output).unwrap();
    assert_eq!(m.mode(), FlagMode::Metric);
    assert_abs_diff_eq!(m.metric_array().unwrap().sum(), 0.0);
    assert_eq!(m.weights_array().unwrap().shape(), &[6, NUM_FREQS, 2]);
}

#[test]
fn test_convert_metric_waterfall_to_flags() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "metric.fits");
    let output = tmp_file(&dir, "wf_flags.fits");
    let mut flags = get_flags(&TIMES);
    flags.to_metric(false);
    {
        let mut m = flags.metric_array_mut().unwrap();
        // All baselines of the first time at channel 2 in xx.
        for row in 0..3 {
            m[[row, 2, 0]] = 3.0;
        }
        m[[4, 1, 1]] = 3.0;
    }
    flags.write(&input, false).unwrap();

    // The mean of the first time at channel 2 is 1.5, and 0.5 for the
    // second time at channel 1.
    let cmd = hyperflag()
        .args([
            "convert",
            &input.display().to_string(),
            &output.display().to_string(),
            "--to-waterfall",
            "--collapse-pol",
            "--method",
            "mean",
            "--to-flag",
            "1.0",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let wf = FlagSet::read(&output).unwrap();
    assert_eq!(wf.flag_type(), FlagType::Waterfall);
    assert_eq!(wf.mode(), FlagMode::Flag);
    assert!(wf.pol_collapsed());
    let f = wf.flag_array().unwrap();
    assert_eq!(f.shape(), &[2, NUM_FREQS, 1]);
    assert!(f[[0, 2, 0]]);
    assert_eq!(num_flagged(&wf), 1);
}

#[test]
fn test_convert_conflicting_modes() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    let output = tmp_file(&dir, "out.fits");
    write_flags(&input, &TIMES, &[]);

    let cmd = hyperflag()
        .args([
            "convert",
            &input.display().to_string(),
            &output.display().to_string(),
            "--to-flag",
            "0.5",
            "--to-metric",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("can't be used together"), "{stderr}");
    assert!(!output.exists());
}

#[test]
fn test_convert_bad_method() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    let output = tmp_file(&dir, "out.fits");
    write_flags(&input, &TIMES, &[]);

    let cmd = hyperflag()
        .args([
            "convert",
            &input.display().to_string(),
            &output.display().to_string(),
            "--to-waterfall",
            "--method",
            "median",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("median"), "{stderr}");
    assert!(!output.exists());
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    let output = tmp_file(&dir, "wf.fits");
    write_flags(&input, &TIMES, &[]);

    let cmd = hyperflag()
        .args([
            "convert",
            &input.display().to_string(),
            &output.display().to_string(),
            "--to-waterfall",
            "--dry-run",
        ])
        .ok();
    let ok = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(ok, "{stdout}\n{stderr}");
    assert!(stdout.contains("Dry run"), "{stdout}");
    assert!(!output.exists());
}

#[test]
fn test_no_clobber() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let input = tmp_file(&dir, "flags.fits");
    let output = tmp_file(&dir, "wf.fits");
    write_flags(&input, &TIMES, &[]);
    let args = [
        "convert".to_string(),
        input.display().to_string(),
        output.display().to_string(),
        "--to-waterfall".to_string(),
    ];

    let cmd = hyperflag().args(&args).ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let cmd = hyperflag().args(&args).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("exists; skipping"), "{stderr}");

    let cmd = hyperflag().args(&args).arg("--clobber").ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
}
