// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The datasets that flag objects are made from and expanded onto.
//!
//! Reading visibilities and calibration solutions is somebody else's job;
//! these structs only hold the metadata (and optionally the flags) that flag
//! objects need.

use indexmap::IndexMap;
use ndarray::prelude::*;

use crate::{flags::FlagSet, polarisation::Polarizations, telescope::Telescope};

/// Baseline-indexed visibility metadata. All of the per-row arrays have length
/// Nblts.
#[derive(Debug, Clone, Default)]
pub struct VisibilityData {
    pub telescope: Telescope,

    /// Julian dates (UTC), one per baseline-time.
    pub time_array: Vec<f64>,
    /// \[radians\]
    pub lst_array: Vec<f64>,
    pub ant_1_array: Vec<u32>,
    pub ant_2_array: Vec<u32>,
    pub baseline_array: Vec<u64>,

    /// \[Hz\]
    pub freq_array: Vec<f64>,
    /// \[Hz\], one per channel.
    pub channel_width: Vec<f64>,
    pub spw_array: Vec<i32>,
    pub flex_spw_id_array: Vec<i32>,
    pub polarization_array: Vec<i32>,

    /// Shape (Nblts, Nfreqs, Npols).
    pub flag_array: Option<Array3<bool>>,

    pub history: String,
    pub extra_keywords: IndexMap<String, serde_json::Value>,
}

impl VisibilityData {
    pub fn nblts(&self) -> usize {
        self.time_array.len()
    }
}

/// Antenna-indexed calibration metadata.
#[derive(Debug, Clone, Default)]
pub struct CalibrationData {
    pub telescope: Telescope,

    /// Unique Julian dates (UTC).
    pub time_array: Vec<f64>,
    pub lst_array: Vec<f64>,
    pub ant_array: Vec<u32>,

    /// Wide-band solutions have no frequency axis.
    pub freq_array: Option<Vec<f64>>,
    pub channel_width: Option<Vec<f64>>,
    pub spw_array: Vec<i32>,
    pub flex_spw_id_array: Option<Vec<i32>>,
    pub jones_array: Vec<i32>,

    /// Shape (Nants_data, Nfreqs, Ntimes, Njones).
    pub flag_array: Option<Array4<bool>>,

    pub history: String,
    pub extra_keywords: IndexMap<String, serde_json::Value>,
}

impl CalibrationData {
    /// The spectral window of each channel. If these aren't set, every
    /// channel is in the first spectral window.
    pub(crate) fn flex_spw_ids(&self) -> Vec<i32> {
        match (&self.flex_spw_id_array, &self.freq_array) {
            (Some(ids), _) => ids.clone(),
            (None, Some(freqs)) => {
                vec![self.spw_array.first().copied().unwrap_or(0); freqs.len()]
            }
            (None, None) => vec![],
        }
    }
}

/// Something that a waterfall flag object can be expanded onto.
#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    Visibility(&'a VisibilityData),
    Calibration(&'a CalibrationData),
    Flags(&'a FlagSet),
}

/// The coordinates of a reference, borrowed in a uniform way.
pub(crate) struct RefCoords<'a> {
    pub(crate) telescope: &'a Telescope,
    pub(crate) time_array: &'a [f64],
    pub(crate) lst_array: &'a [f64],
    pub(crate) freq_array: &'a [f64],
    pub(crate) channel_width: &'a [f64],
    pub(crate) spw_array: &'a [i32],
    pub(crate) flex_spw_id_array: Vec<i32>,
    pub(crate) pols: Polarizations,
    pub(crate) rows: RefRows<'a>,
}

#[derive(Clone, Copy)]
pub(crate) enum RefRows<'a> {
    Baselines {
        ant_1_array: &'a [u32],
        ant_2_array: &'a [u32],
        baseline_array: &'a [u64],
    },
    Antennas {
        ant_array: &'a [u32],
    },
    /// A waterfall-type flag object; not a valid target of an expansion.
    None,
}

impl<'a> Reference<'a> {
    pub(crate) fn coords(&self) -> RefCoords<'a> {
        match *self {
            Reference::Visibility(v) => RefCoords {
                telescope: &v.telescope,
                time_array: &v.time_array,
                lst_array: &v.lst_array,
                freq_array: &v.freq_array,
                channel_width: &v.channel_width,
                spw_array: &v.spw_array,
                flex_spw_id_array: v.flex_spw_id_array.clone(),
                pols: Polarizations::Codes(v.polarization_array.clone()),
                rows: RefRows::Baselines {
                    ant_1_array: &v.ant_1_array,
                    ant_2_array: &v.ant_2_array,
                    baseline_array: &v.baseline_array,
                },
            },
            Reference::Calibration(c) => RefCoords {
                telescope: &c.telescope,
                time_array: &c.time_array,
                lst_array: &c.lst_array,
                freq_array: c.freq_array.as_deref().unwrap_or(&[]),
                channel_width: c.channel_width.as_deref().unwrap_or(&[]),
                spw_array: &c.spw_array,
                flex_spw_id_array: c.flex_spw_ids(),
                pols: Polarizations::Codes(c.jones_array.clone()),
                rows: RefRows::Antennas {
                    ant_array: &c.ant_array,
                },
            },
            Reference::Flags(f) => RefCoords {
                telescope: &f.telescope,
                time_array: &f.time_array,
                lst_array: &f.lst_array,
                freq_array: &f.freq_array,
                channel_width: &f.channel_width,
                spw_array: &f.spw_array,
                flex_spw_id_array: f.flex_spw_id_array.clone(),
                pols: f.polarization_array.clone(),
                rows: match f.baseline_rows() {
                    Some((ant_1_array, ant_2_array, baseline_array)) => RefRows::Baselines {
                        ant_1_array,
                        ant_2_array,
                        baseline_array,
                    },
                    None => match f.ant_rows() {
                        Some(ant_array) => RefRows::Antennas { ant_array },
                        None => RefRows::None,
                    },
                },
            },
        }
    }
}
