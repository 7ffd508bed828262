// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Metadata on the telescope that produced the data being flagged.


use log::warn;
use marlu::{LatLngHeight, XyzGeodetic};
use ndarray::{Array2, Axis};
use thiserror::Error;

use crate::{
    constants::{ANTPOS_TOL, LOCATION_TOL},
    math::{all_close, arrays_close, is_close},
};

/// Telescope metadata. Everything is optional because flag files and
/// reference datasets can come with very little of it.
#[derive(Debug, Clone, Default)]
pub struct Telescope {
    pub name: Option<String>,
    pub location: Option<LatLngHeight>,
    pub instrument: Option<String>,

    /// The antenna numbers of the whole array (not just those with data).
    pub antenna_numbers: Option<Vec<u32>>,
    pub antenna_names: Option<Vec<String>>,
    /// Positions relative to the array centre.
    pub antenna_positions: Option<Vec<XyzGeodetic>>,
    pub antenna_diameters: Option<Vec<f64>>,

    pub feed_array: Option<Vec<String>>,
    /// One angle \[radians\] per antenna per feed.
    pub feed_angle: Option<Array2<f64>>,
    pub mount_type: Option<Vec<String>>,
}

impl Telescope {
    /// Get the metadata of a telescope that this crate knows about. Only the
    /// name, instrument and location are set.
    pub fn from_known(name: &str) -> Result<Telescope, TelescopeError> {
        let location = match name.to_uppercase().as_str() {
            "MWA" => LatLngHeight::mwa(),
            "HERA" => LatLngHeight {
                longitude_rad: 21.428_303_826_863_015_f64.to_radians(),
                latitude_rad: (-30.721_526_120_689_57_f64).to_radians(),
                height_metres: 1051.69,
            },
            _ => return Err(TelescopeError::Unknown(name.to_string())),
        };
        Ok(Telescope {
            name: Some(name.to_uppercase()),
            location: Some(location),
            instrument: Some(name.to_uppercase()),
            ..Default::default()
        })
    }

    /// The number of antennas in the array, if known.
    pub fn num_antennas(&self) -> Option<usize> {
        self.antenna_numbers.as_ref().map(|n| n.len())
    }

    /// Check that the per-antenna arrays are consistent with each other.
    pub fn check(&self) -> Result<(), TelescopeError> {
        let num_ants = match &self.antenna_numbers {
            Some(n) => n.len(),
            None => {
                if self.antenna_names.is_some() || self.antenna_positions.is_some() {
                    return Err(TelescopeError::MissingAntennaNumbers);
                }
                return Ok(());
            }
        };

        let check_len = |field: &'static str, len: Option<usize>| match len {
            Some(len) if len != num_ants => Err(TelescopeError::BadLength {
                field,
                expected: num_ants,
                got: len,
            }),
            _ => Ok(()),
        };
        check_len("antenna_names", self.antenna_names.as_ref().map(|v| v.len()))?;
        check_len(
            "antenna_positions",
            self.antenna_positions.as_ref().map(|v| v.len()),
        )?;
        check_len(
            "antenna_diameters",
            self.antenna_diameters.as_ref().map(|v| v.len()),
        )?;
        check_len("mount_type", self.mount_type.as_ref().map(|v| v.len()))?;
        check_len(
            "feed_angle",
            self.feed_angle.as_ref().map(|a| a.len_of(Axis(0))),
        )?;

        if let (Some(feeds), Some(angles)) = (&self.feed_array, &self.feed_angle) {
            if angles.len_of(Axis(1)) != feeds.len() {
                return Err(TelescopeError::BadLength {
                    field: "feed_angle",
                    expected: feeds.len(),
                    got: angles.len_of(Axis(1)),
                });
            }
        }

        Ok(())
    }

    /// Set any missing metadata from another telescope. Nothing already
    /// present is overwritten.
    pub fn fill_missing_from(&mut self, other: &Telescope) {
        macro_rules! fill {
            ($($field:ident),*) => {
                $(
                    if self.$field.is_none() {
                        self.$field = other.$field.clone();
                    }
                )*
            };
        }
        fill!(
            name,
            location,
            instrument,
            antenna_numbers,
            antenna_names,
            antenna_positions,
            antenna_diameters,
            feed_array,
            feed_angle,
            mount_type
        );
    }

    /// Get the index of an antenna number in the telescope's antenna table.
    pub(crate) fn antenna_index(&self, number: u32) -> Option<usize> {
        self.antenna_numbers
            .as_ref()
            .and_then(|n| n.iter().position(|&a| a == number))
    }

    /// Merge another telescope's antenna table into this one. Antennas not
    /// already present are appended; those present in both keep this
    /// telescope's metadata, with a warning if the other telescope disagrees.
    pub(crate) fn merge_antennas(&mut self, other: &Telescope) {
        if self.antenna_numbers.is_none() {
            self.antenna_numbers = other.antenna_numbers.clone();
            self.antenna_names = other.antenna_names.clone();
            self.antenna_positions = other.antenna_positions.clone();
            self.antenna_diameters = other.antenna_diameters.clone();
            return;
        }
        let (Some(numbers), Some(other_numbers)) = (&self.antenna_numbers, &other.antenna_numbers)
        else {
            return;
        };

        let mut new_indices = vec![];
        let mut disagreement = false;
        for (i_other, number) in other_numbers.iter().enumerate() {
            match numbers.iter().position(|n| n == number) {
                None => new_indices.push(i_other),
                Some(i_self) => {
                    if let (Some(names), Some(other_names)) =
                        (&self.antenna_names, &other.antenna_names)
                    {
                        disagreement |= names[i_self] != other_names[i_other];
                    }
                    if let (Some(pos), Some(other_pos)) =
                        (&self.antenna_positions, &other.antenna_positions)
                    {
                        disagreement |= !positions_close(
                            &pos[i_self..=i_self],
                            &other_pos[i_other..=i_other],
                        );
                    }
                }
            }
        }
        if disagreement {
            warn!("Telescope antenna names or positions differ between the objects; keeping the values of the first object");
        }

        let new_numbers: Vec<u32> = new_indices.iter().map(|&i| other_numbers[i]).collect();
        if let Some(numbers) = self.antenna_numbers.as_mut() {
            numbers.extend(new_numbers);
        }
        merge_field(&mut self.antenna_names, &other.antenna_names, &new_indices);
        merge_field(
            &mut self.antenna_positions,
            &other.antenna_positions,
            &new_indices,
        );
        merge_field(
            &mut self.antenna_diameters,
            &other.antenna_diameters,
            &new_indices,
        );
        merge_field(&mut self.mount_type, &other.mount_type, &new_indices);
        // Feed angles are 2D and rarely populated; drop them rather than guess.
        if !new_indices.is_empty() && self.feed_angle.is_some() {
            self.feed_angle = None;
        }
    }

    /// Compare the name and location of two telescopes, returning the name of
    /// the first field that differs.
    pub(crate) fn identity_mismatch(&self, other: &Telescope) -> Option<&'static str> {
        if self.name != other.name {
            return Some("telescope name");
        }
        if !locations_close(self.location, other.location) {
            return Some("telescope location");
        }
        None
    }

    /// Compare the antenna tables of two telescopes, returning the name of the
    /// first field that differs.
    pub(crate) fn antenna_mismatch(&self, other: &Telescope) -> Option<&'static str> {
        if self.antenna_numbers != other.antenna_numbers {
            return Some("antenna_numbers");
        }
        if self.antenna_names != other.antenna_names {
            return Some("antenna_names");
        }
        match (&self.antenna_positions, &other.antenna_positions) {
            (Some(a), Some(b)) if !positions_close(a, b) => return Some("antenna_positions"),
            (Some(_), None) | (None, Some(_)) => return Some("antenna_positions"),
            _ => (),
        }
        None
    }

    /// For the fields that may differ between objects being combined, null
    /// this telescope's field (with a warning) if it differs from the other
    /// telescope's. When `antennas_merged` is set the per-antenna fields are
    /// left alone; [`Telescope::merge_antennas`] handles them.
    pub(crate) fn null_differing_optional_fields(&mut self, other: &Telescope, antennas_merged: bool) {
        if !antennas_merged && !option_vec_close(&self.antenna_diameters, &other.antenna_diameters) {
            warn!("Telescope.antenna_diameters does not match. Continuing anyway.");
            self.antenna_diameters = None;
        }
        if self.feed_array != other.feed_array {
            warn!("Telescope.feed_array does not match. Continuing anyway.");
            self.feed_array = None;
        }
        let angles_match = match (&self.feed_angle, &other.feed_angle) {
            (Some(a), Some(b)) => arrays_close(a.view(), b.view(), ANTPOS_TOL),
            (None, None) => true,
            _ => false,
        };
        if !antennas_merged && !angles_match {
            warn!("Telescope.feed_angle does not match. Continuing anyway.");
            self.feed_angle = None;
        }
        if !antennas_merged && self.mount_type != other.mount_type {
            warn!("Telescope.mount_type does not match. Continuing anyway.");
            self.mount_type = None;
        }
        if self.instrument != other.instrument {
            warn!("Telescope.instrument does not match. Continuing anyway.");
            self.instrument = None;
        }
    }
}

impl PartialEq for Telescope {
    fn eq(&self, other: &Self) -> bool {
        self.identity_mismatch(other).is_none()
            && self.antenna_mismatch(other).is_none()
            && self.instrument == other.instrument
            && option_vec_close(&self.antenna_diameters, &other.antenna_diameters)
            && self.feed_array == other.feed_array
            && match (&self.feed_angle, &other.feed_angle) {
                (Some(a), Some(b)) => arrays_close(a.view(), b.view(), ANTPOS_TOL),
                (None, None) => true,
                _ => false,
            }
            && self.mount_type == other.mount_type
    }
}

fn merge_field<T: Clone>(this: &mut Option<Vec<T>>, other: &Option<Vec<T>>, new_indices: &[usize]) {
    if new_indices.is_empty() {
        return;
    }
    match (this.as_mut(), other) {
        (Some(this), Some(other)) => this.extend(new_indices.iter().map(|&i| other[i].clone())),
        // One side doesn't know this field, so the merged table can't either.
        _ => *this = None,
    }
}

fn option_vec_close(a: &Option<Vec<f64>>, b: &Option<Vec<f64>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => all_close(a, b, ANTPOS_TOL),
        (None, None) => true,
        _ => false,
    }
}

fn positions_close(a: &[XyzGeodetic], b: &[XyzGeodetic]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(a, b)| {
            is_close(a.x, b.x, ANTPOS_TOL)
                && is_close(a.y, b.y, ANTPOS_TOL)
                && is_close(a.z, b.z, ANTPOS_TOL)
        })
}

fn locations_close(a: Option<LatLngHeight>, b: Option<LatLngHeight>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            is_close(a.longitude_rad, b.longitude_rad, LOCATION_TOL)
                && is_close(a.latitude_rad, b.latitude_rad, LOCATION_TOL)
                && is_close(a.height_metres, b.height_metres, LOCATION_TOL)
        }
        (None, None) => true,
        _ => false,
    }
}

#[derive(Error, Debug)]
pub enum TelescopeError {
    #[error("Telescope {0} is not in the known telescopes.")]
    Unknown(String),

    #[error("Telescope antenna names or positions are set, but antenna_numbers is not.")]
    MissingAntennaNumbers,

    #[error("Telescope {field} has length {got}, but there are {expected} antennas")]
    BadLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },
}
