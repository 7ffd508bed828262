// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

use approx::assert_abs_diff_eq;
use fitsio::{
    images::{ImageDescription, ImageType},
    tables::{ColumnDataType, ColumnDescription},
    FitsFile,
};
use hifitime::Duration;
use marlu::LatLngHeight;
use serde_json::json;
use tempfile::TempDir;
use vec1::vec1;

use super::*;
use crate::{
    constants::VERSION_STR,
    flags::{CollapseMethod, FlagError, FlagMode, FlagSet, FlagType, SelectCriteria},
    history::History,
    lst::get_lsts,
    polarisation::Polarizations,
    tests::{get_antenna_flags, get_baseline_flags, get_waterfall_flags, test_times},
};

fn fill_metric(flags: &mut FlagSet) {
    let mut metric = flags.metric_array_mut().unwrap();
    for (i, m) in metric.iter_mut().enumerate() {
        *m = i as f64 * 0.25;
    }
}

/// Write a primary HDU with only these string keys.
fn write_bare_primary(path: &Path, keys: &[(&str, &str)]) -> FitsFile {
    let mut fptr = FitsFile::create(path).open().unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    for (key, value) in keys {
        hdu.write_key(&mut fptr, key, *value).unwrap();
    }
    fptr
}

#[test]
fn test_baseline_metric_round_trip() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let path = dir.path().join("flags.fits");

    let mut flags = get_baseline_flags();
    fill_metric(&mut flags);
    flags.label = "A label much longer than a single FITS header card can hold, which needs CONTINUE cards".to_string();
    flags
        .extra_keywords
        .insert("OBSID".to_string(), json!(1090008640));
    flags
        .extra_keywords
        .insert("NOTES".to_string(), json!({"rfi": ["dtv", "orbcomm"]}));
    flags.write(&path, false).unwrap();

    let read = FlagSet::read(&path).unwrap();
    assert!(read.equals(&flags, true));
    assert_eq!(read.flag_type(), FlagType::Baseline);
    assert_eq!(read.mode(), FlagMode::Metric);
    assert_eq!(read.label, flags.label);
    assert_eq!(read.extra_keywords, flags.extra_keywords);
    assert_eq!(read.filename, vec!["flags.fits".to_string()]);
    assert!(read.history.contains(&VERSION_STR));
    assert_eq!(read.telescope.antenna_names, flags.telescope.antenna_names);
}

#[test]
fn test_antenna_flag_round_trip() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let path = dir.path().join("ants.fits");

    let mut flags = get_antenna_flags();
    flags.to_flag(None);
    {
        let mut f = flags.flag_array_mut().unwrap();
        f[[1, 3, 0, 1]] = true;
        f[[3, 19, 2, 0]] = true;
    }
    flags.write(&path, false).unwrap();

    let read = FlagSet::read(&path).unwrap();
    assert!(read.equals(&flags, true));
    let f = read.flag_array().unwrap();
    assert_eq!(f.iter().filter(|&&f| f).count(), 2);
    assert!(f[[1, 3, 0, 1]]);
    assert_eq!(read.nants_data(), Some(4));
}

#[test]
fn test_collapsed_waterfall_round_trip() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let path = dir.path().join("wf.fits");

    let mut flags = get_baseline_flags();
    fill_metric(&mut flags);
    flags
        .to_waterfall(CollapseMethod::QuadMean, false, true)
        .unwrap();
    assert!(flags.weights_square_array().is_some());
    flags.write(&path, false).unwrap();

    let read = FlagSet::read(&path).unwrap();
    assert!(read.equals(&flags, true));
    assert_eq!(
        read.polarization_array,
        Polarizations::Collapsed("-5,-6".to_string())
    );
    assert_abs_diff_eq!(
        read.weights_square_array().unwrap(),
        flags.weights_square_array().unwrap()
    );
}

#[test]
fn test_clobber() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let path = dir.path().join("wf.fits");

    let mut flags = get_waterfall_flags();
    flags.write(&path, false).unwrap();
    let result = flags.write(&path, false);
    assert!(result.is_err());
    assert_eq!(
        result.unwrap_err().to_string(),
        format!("File {} exists; skipping", path.display())
    );

    flags.to_flag(None);
    flags.write(&path, true).unwrap();
    assert_eq!(FlagSet::read(&path).unwrap().mode(), FlagMode::Flag);
}

#[test]
fn test_invalid_object_doesnt_clobber() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let path = dir.path().join("wf.fits");

    let mut flags = get_waterfall_flags();
    flags.write(&path, false).unwrap();

    let mut bad = flags.clone();
    bad.lst_array.pop();
    let result = bad.write(&path, true);
    assert!(matches!(result, Err(FlagWriteError::Flag(FlagError::BadLength { .. }))));

    // The existing file is untouched.
    let read = FlagSet::read(&path).unwrap();
    assert!(read.equals(&flags, true));
}

#[test]
fn test_write_tags_the_history() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let path = dir.path().join("wf.fits");

    let mut flags = get_waterfall_flags();
    flags.history = History::new();
    flags.history.push("Made by hand.");
    flags.write(&path, false).unwrap();
    assert!(flags.history.contains(&VERSION_STR));

    let read = FlagSet::read(&path).unwrap();
    assert_eq!(read.history, flags.history);
}

#[test]
fn test_read_errors() {
    let dir = TempDir::new().expect("couldn't make tmp dir");

    let missing = dir.path().join("missing.fits");
    let result = FlagSet::read(&missing);
    assert!(matches!(result, Err(FlagReadError::NotFound(_))));
    assert_eq!(
        result.unwrap_err().to_string(),
        format!("{} not found", missing.display())
    );

    let bad_mode = dir.path().join("bad_mode.fits");
    drop(write_bare_primary(
        &bad_mode,
        &[("TYPE", "baseline"), ("MODE", "bogus")],
    ));
    let result = FlagSet::read(&bad_mode);
    assert_eq!(
        result.unwrap_err().to_string(),
        "File cannot be read. Received mode \"bogus\""
    );

    let bad_type = dir.path().join("bad_type.fits");
    drop(write_bare_primary(
        &bad_type,
        &[("TYPE", "spectrum"), ("MODE", "flag")],
    ));
    let result = FlagSet::read(&bad_type);
    assert_eq!(
        result.unwrap_err().to_string(),
        "File cannot be read. Received type \"spectrum\""
    );
}

#[test]
fn test_read_sparse_file() {
    // Only the bare minimum: no counters, channel widths, spectral windows,
    // LSTs or history.
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let path = dir.path().join("sparse.fits");
    let mwa = LatLngHeight::mwa();
    let times = test_times()[..2].to_vec();
    let freqs = vec![150e6, 150.04e6, 150.08e6];

    let mut fptr = write_bare_primary(
        &path,
        &[("TYPE", "waterfall"), ("MODE", "flag"), ("TELNAME", "MWA")],
    );
    let hdu = fptr.primary_hdu().unwrap();
    hdu.write_key(&mut fptr, "TELLAT", mwa.latitude_rad.to_degrees())
        .unwrap();
    hdu.write_key(&mut fptr, "TELLON", mwa.longitude_rad.to_degrees())
        .unwrap();
    hdu.write_key(&mut fptr, "TELALT", mwa.height_metres)
        .unwrap();

    let double = |name: &str| {
        ColumnDescription::new(name)
            .with_type(ColumnDataType::Double)
            .create()
            .unwrap()
    };
    let hdu = fptr.create_table("TIMES", &[double("Time")]).unwrap();
    hdu.write_col(&mut fptr, "Time", &times).unwrap();
    let hdu = fptr.create_table("FREQS", &[double("Freq")]).unwrap();
    hdu.write_col(&mut fptr, "Freq", &freqs).unwrap();
    let pol = ColumnDescription::new("Pol")
        .with_type(ColumnDataType::Int)
        .create()
        .unwrap();
    let hdu = fptr.create_table("POLS", &[pol]).unwrap();
    hdu.write_col(&mut fptr, "Pol", &[-5_i32]).unwrap();
    let image = ImageDescription {
        data_type: ImageType::UnsignedByte,
        dimensions: &[2, 3, 1],
    };
    let hdu = fptr.create_image("FLAGS", &image).unwrap();
    hdu.write_image(&mut fptr, &[0_u8, 1, 0, 0, 0, 1]).unwrap();
    drop(fptr);

    let flags = FlagSet::read(&path).unwrap();
    assert_eq!(flags.flag_type(), FlagType::Waterfall);
    assert_abs_diff_eq!(flags.channel_width.as_slice(), [40e3; 3].as_slice(), epsilon = 1e-3);
    assert_eq!(flags.spw_array, vec![0]);
    assert_eq!(flags.flex_spw_id_array, vec![0; 3]);
    let expected_lsts = get_lsts(&times, mwa.longitude_rad, Duration::from_seconds(0.0));
    assert_abs_diff_eq!(flags.lst_array.as_slice(), expected_lsts.as_slice(), epsilon = 1e-10);
    assert!(flags.telescope.antenna_numbers.is_none());
    assert!(flags.history.contains(&VERSION_STR));

    let f = flags.flag_array().unwrap();
    assert!(f[[0, 1, 0]]);
    assert!(f[[1, 2, 0]]);
    assert_eq!(f.iter().filter(|&&f| f).count(), 2);
}

#[test]
fn test_read_many_detects_the_axis() {
    let dir = TempDir::new().expect("couldn't make tmp dir");
    let mut flags = get_baseline_flags();
    fill_metric(&mut flags);
    let times = test_times();

    // Split along time.
    let early = dir.path().join("early.fits");
    let late = dir.path().join("late.fits");
    flags
        .select(&SelectCriteria::new().times(vec![times[0]]))
        .unwrap()
        .write(&early, false)
        .unwrap();
    flags
        .select(&SelectCriteria::new().times(vec![times[1], times[2]]))
        .unwrap()
        .write(&late, false)
        .unwrap();
    let combined = FlagSet::read_many(&vec1![early.clone(), late]).unwrap();
    assert!(combined.equals(&flags, false));
    assert_eq!(combined.filename, vec!["early.fits", "late.fits"]);

    // Split along frequency.
    let low = dir.path().join("low.fits");
    let high = dir.path().join("high.fits");
    flags
        .select(&SelectCriteria::new().freq_chans((0..10).collect()))
        .unwrap()
        .write(&low, false)
        .unwrap();
    flags
        .select(&SelectCriteria::new().freq_chans((10..20).collect()))
        .unwrap()
        .write(&high, false)
        .unwrap();
    let combined = FlagSet::read_many(&vec1![low, high]).unwrap();
    assert!(combined.equals(&flags, false));

    // Split along baseline. Both parts repeat the same 3 times.
    let one = dir.path().join("bl_one.fits");
    let others = dir.path().join("bl_others.fits");
    flags
        .select(&SelectCriteria::new().bls(vec![(0, 1)]))
        .unwrap()
        .write(&one, false)
        .unwrap();
    flags
        .select(&SelectCriteria::new().bls(vec![(0, 1)]).invert(true))
        .unwrap()
        .write(&others, false)
        .unwrap();
    let combined = FlagSet::read_many(&vec1![one, others]).unwrap();
    assert_eq!(combined.ntimes(), 3);
    assert_eq!(combined.nbls(), flags.nbls());
    assert_eq!(combined.nblts(), flags.nblts());

    // A single file is just read.
    let single = FlagSet::read_many(&vec1![early]).unwrap();
    assert_eq!(single.ntimes(), 1);
}
