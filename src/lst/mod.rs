// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Local sidereal time computation.
//!
//! LSTs are computed once per unique time and then scattered back over the
//! (possibly repeating) time array. This can be done on a background thread
//! with [`FlagSet::spawn_lst_update`]; the returned [`LstTask`] must be joined
//! before the LSTs are used, and the flag object must not have its times
//! changed in the meantime.

#[cfg(test)]
mod tests;

use std::thread::{self, JoinHandle};

use hifitime::{Duration, Epoch};
use marlu::precession::get_lmst;
use rayon::prelude::*;

use crate::{
    flags::{FlagError, FlagSet},
    math::unique_f64,
};

/// Get the LST \[radians\] of each time (a Julian date in UTC) at the given
/// longitude.
pub fn get_lsts(times_jd: &[f64], longitude_rad: f64, dut1: Duration) -> Vec<f64> {
    let unique_times = unique_f64(times_jd);
    let unique_lsts: Vec<f64> = unique_times
        .par_iter()
        .map(|&jd| get_lmst(longitude_rad, Epoch::from_jde_utc(jd), dut1))
        .collect();

    times_jd
        .iter()
        .map(|t| {
            // Every time is in the unique set, so this search can't fail.
            let i = unique_times
                .binary_search_by(|u| u.total_cmp(t))
                .unwrap_or_else(|i| i);
            unique_lsts[i]
        })
        .collect()
}

/// A handle on LSTs being computed on another thread.
#[derive(Debug)]
pub struct LstTask {
    handle: JoinHandle<Vec<f64>>,
    num_times: usize,
}

impl LstTask {
    /// Wait for the LSTs to be computed and give them to the flag object.
    pub fn join_into(self, flags: &mut FlagSet) -> Result<(), FlagError> {
        let lsts = self.handle.join().map_err(|_| FlagError::LstThreadPanicked)?;
        if flags.time_array.len() != self.num_times {
            return Err(FlagError::BadLength {
                name: "time_array",
                expected: self.num_times,
                got: flags.time_array.len(),
            });
        }
        flags.lst_array = lsts;
        Ok(())
    }
}

impl FlagSet {
    fn longitude_for_lsts(&self) -> Result<f64, FlagError> {
        self.telescope
            .location
            .map(|l| l.longitude_rad)
            .ok_or(FlagError::NoTelescopeLocation)
    }

    /// Recompute the LSTs from the time array and the telescope location.
    pub fn set_lsts_from_time_array(&mut self) -> Result<(), FlagError> {
        let longitude_rad = self.longitude_for_lsts()?;
        self.lst_array = get_lsts(&self.time_array, longitude_rad, Duration::from_seconds(0.0));
        Ok(())
    }

    /// Start recomputing the LSTs on a background thread. The LSTs are only
    /// set once [`LstTask::join_into`] is called.
    pub fn spawn_lst_update(&self) -> Result<LstTask, FlagError> {
        let longitude_rad = self.longitude_for_lsts()?;
        let times = self.time_array.clone();
        let num_times = times.len();
        let handle = thread::Builder::new()
            .name("lst".to_string())
            .spawn(move || get_lsts(&times, longitude_rad, Duration::from_seconds(0.0)))?;
        Ok(LstTask { handle, num_times })
    }
}
