// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::tests::get_waterfall_flags;

#[test]
fn test_get_lsts_repeats() {
    let lon = 116.67_f64.to_radians();
    let times = [2459000.5, 2459000.6, 2459000.5];
    let lsts = get_lsts(&times, lon, Duration::from_seconds(0.0));
    assert_eq!(lsts.len(), 3);
    assert_abs_diff_eq!(lsts[0], lsts[2]);
    // About 2.4 hours of sidereal rotation between the two times.
    let diff = (lsts[1] - lsts[0]).rem_euclid(std::f64::consts::TAU);
    assert_abs_diff_eq!(diff, 0.1 * 1.002_737_9 * std::f64::consts::TAU, epsilon = 1e-3);
}

#[test]
fn test_background_lsts_match() {
    let mut flags = get_waterfall_flags();
    let expected = get_lsts(
        &flags.time_array,
        flags.telescope.location.unwrap().longitude_rad,
        Duration::from_seconds(0.0),
    );
    flags.lst_array.iter_mut().for_each(|l| *l = 0.0);

    let task = flags.spawn_lst_update().unwrap();
    task.join_into(&mut flags).unwrap();
    assert_abs_diff_eq!(flags.lst_array.as_slice(), expected.as_slice());

    flags.lst_array.iter_mut().for_each(|l| *l = 0.0);
    flags.set_lsts_from_time_array().unwrap();
    assert_abs_diff_eq!(flags.lst_array.as_slice(), expected.as_slice());
}

#[test]
fn test_background_lsts_detect_changed_times() {
    let mut flags = get_waterfall_flags();
    let task = flags.spawn_lst_update().unwrap();
    flags.time_array.push(2459000.9);
    assert!(matches!(
        task.join_into(&mut flags),
        Err(FlagError::BadLength { .. })
    ));
}

#[test]
fn test_lsts_need_location() {
    let mut flags = get_waterfall_flags();
    flags.telescope.location = None;
    assert!(matches!(
        flags.set_lsts_from_time_array(),
        Err(FlagError::NoTelescopeLocation)
    ));
    assert!(flags.spawn_lst_update().is_err());
}
