// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests.

use hifitime::Duration;
use itertools::Itertools;
use marlu::XyzGeodetic;
use ndarray::prelude::*;

use crate::{
    flags::{FlagSet, FlagSetOptions},
    lst::get_lsts,
    math::antnums_to_baseline,
    reference::{CalibrationData, VisibilityData},
    telescope::Telescope,
};

pub(crate) const NUM_ANTS: u32 = 4;
pub(crate) const NUM_TIMES: usize = 3;
pub(crate) const NUM_FREQS: usize = 20;

/// Unique times of the test data (8 s apart).
pub(crate) fn test_times() -> Vec<f64> {
    (0..NUM_TIMES)
        .map(|i| 2459000.5 + i as f64 * 8.0 / 86400.0)
        .collect()
}

/// MWA-like 40 kHz channels.
pub(crate) fn test_freqs() -> Vec<f64> {
    (0..NUM_FREQS)
        .map(|i| 167.035e6 + i as f64 * 40e3)
        .collect()
}

pub(crate) fn test_telescope() -> Telescope {
    Telescope {
        antenna_numbers: Some((0..NUM_ANTS).collect()),
        antenna_names: Some((0..NUM_ANTS).map(|a| format!("Tile{a:03}")).collect()),
        antenna_positions: Some(
            (0..NUM_ANTS)
                .map(|a| XyzGeodetic {
                    x: 10.0 * f64::from(a),
                    y: -5.0 * f64::from(a),
                    z: 0.5 * f64::from(a),
                })
                .collect(),
        ),
        ..Telescope::from_known("MWA").unwrap()
    }
}

fn test_lsts(times: &[f64]) -> Vec<f64> {
    let lon = Telescope::from_known("MWA")
        .unwrap()
        .location
        .unwrap()
        .longitude_rad;
    get_lsts(times, lon, Duration::from_seconds(0.0))
}

/// Visibility metadata with all 10 baselines (autos included) of 4 antennas
/// over 3 times, ordered time-major. Nothing is flagged.
pub(crate) fn get_visibility_data(pols: &[i32]) -> VisibilityData {
    let antpairs: Vec<(u32, u32)> = (0..NUM_ANTS)
        .tuple_combinations()
        .chain((0..NUM_ANTS).map(|a| (a, a)))
        .sorted()
        .collect();
    let mut time_array = vec![];
    let mut ant_1_array = vec![];
    let mut ant_2_array = vec![];
    for t in test_times() {
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
    let nblts = time_array.len();

    VisibilityData {
        telescope: test_telescope(),
        lst_array: test_lsts(&time_array),
        time_array,
        ant_1_array,
        ant_2_array,
        baseline_array,
        freq_array: test_freqs(),
        channel_width: vec![40e3; NUM_FREQS],
        spw_array: vec![0],
        flex_spw_id_array: vec![0; NUM_FREQS],
        polarization_array: pols.to_vec(),
        flag_array: Some(Array3::from_elem((nblts, NUM_FREQS, pols.len()), false)),
        history: "Test visibilities.".to_string(),
        ..Default::default()
    }
}

/// Calibration metadata for 4 antennas, 3 times and XX and YY Jones terms.
/// The times are the same as those of [`get_visibility_data`].
pub(crate) fn get_calibration_data() -> CalibrationData {
    let times = test_times();
    CalibrationData {
        telescope: test_telescope(),
        lst_array: test_lsts(&times),
        time_array: times,
        ant_array: (0..NUM_ANTS).collect(),
        freq_array: Some(test_freqs()),
        channel_width: Some(vec![40e3; NUM_FREQS]),
        spw_array: vec![0],
        flex_spw_id_array: None,
        jones_array: vec![-5, -6],
        flag_array: Some(Array4::from_elem(
            (NUM_ANTS as usize, NUM_FREQS, NUM_TIMES, 2),
            false,
        )),
        history: "Test calibration solutions.".to_string(),
        ..Default::default()
    }
}

/// A metric-mode baseline-type flag object with XX and YY.
pub(crate) fn get_baseline_flags() -> FlagSet {
    FlagSet::from_visibility(
        &get_visibility_data(&[-5, -6]),
        &FlagSetOptions::default(),
    )
    .unwrap()
}

/// A metric-mode antenna-type flag object.
pub(crate) fn get_antenna_flags() -> FlagSet {
    FlagSet::from_calibration(&get_calibration_data(), &FlagSetOptions::default()).unwrap()
}

/// A metric-mode waterfall with XX and YY.
pub(crate) fn get_waterfall_flags() -> FlagSet {
    FlagSet::from_visibility(
        &get_visibility_data(&[-5, -6]),
        &FlagSetOptions {
            waterfall: true,
            ..Default::default()
        },
    )
    .unwrap()
}
