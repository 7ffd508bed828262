// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading flag objects from FITS files.

use std::{path::Path, str::FromStr};

use fitsio::{hdu::FitsHdu, FitsFile};
use indexmap::IndexMap;
use log::{debug, warn};
use marlu::{LatLngHeight, XyzGeodetic};
use ndarray::prelude::*;
use vec1::Vec1;

use super::{
    fits::{
        fits_get_col, fits_get_image, fits_get_image_size, fits_get_optional_key,
        fits_get_optional_key_long_string, fits_get_required_key, fits_has_col, fits_open,
        fits_open_hdu, fits_open_optional_hdu,
    },
    FlagReadError,
};
use crate::{
    constants::{FREQ_TOL, TIME_TOL},
    flags::{FlagAxis, FlagData, FlagMode, FlagSet, FlagType, Values},
    history::History,
    math::{all_close, unique_f64},
    polarisation::Polarizations,
    telescope::Telescope,
};

/// Convert a column of non-negative integers.
fn from_i32<T: TryFrom<i32>>(
    values: Vec<i32>,
    what: &'static str,
    file: &str,
) -> Result<Vec<T>, FlagReadError> {
    values
        .into_iter()
        .map(|v| {
            T::try_from(v).map_err(|_| FlagReadError::Negative {
                file: file.to_string(),
                what,
                value: v,
            })
        })
        .collect()
}

/// Warn if a size counter in the file disagrees with (or is missing from) the
/// data. The data always win.
fn check_counter(key: &str, in_file: Option<usize>, computed: Option<usize>) {
    match (in_file, computed) {
        (Some(f), Some(c)) if f != c => {
            if key == "NANTSDAT" {
                warn!("Nants_data in file does not match number of antennas with data.");
            } else {
                warn!("{key} in file ({f}) does not match the data ({c}); using the data.");
            }
        }
        (None, Some(c)) => warn!("{key} not available in file, computing it from the data ({c})."),
        _ => (),
    }
}

/// Channel widths from the spacing of the frequencies (the median spacing, so
/// that a gap between spectral windows doesn't matter).
fn widths_from_spacing(freqs: &[f64]) -> Option<Vec<f64>> {
    let mut spacings = freqs
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .collect::<Vec<_>>();
    if spacings.is_empty() {
        return None;
    }
    spacings.sort_unstable_by(f64::total_cmp);
    let median = spacings[spacings.len() / 2];
    Some(vec![median; freqs.len()])
}

struct Reader {
    fptr: FitsFile,
    file: String,
}

impl Reader {
    fn image<D: Dimension>(&mut self, hdu: &FitsHdu) -> Result<Array<f64, D>, FlagReadError> {
        let shape = fits_get_image_size(&self.fptr, hdu)?.to_vec();
        let data: Vec<f64> = fits_get_image(&mut self.fptr, hdu)?;
        self.to_array(shape, data)
    }

    fn flag_image<D: Dimension>(&mut self, hdu: &FitsHdu) -> Result<Array<bool, D>, FlagReadError> {
        let shape = fits_get_image_size(&self.fptr, hdu)?.to_vec();
        let data: Vec<u8> = fits_get_image(&mut self.fptr, hdu)?;
        self.to_array(shape, data.into_iter().map(|b| b != 0).collect())
    }

    fn to_array<T, D: Dimension>(
        &self,
        shape: Vec<usize>,
        data: Vec<T>,
    ) -> Result<Array<T, D>, FlagReadError> {
        Array::from_shape_vec(IxDyn(&shape), data)
            .and_then(|a| a.into_dimensionality::<D>())
            .map_err(|err| FlagReadError::Shape {
                file: self.file.clone(),
                err,
            })
    }

    fn values<D: Dimension>(&mut self, mode: FlagMode) -> Result<Values<D>, FlagReadError> {
        let values = match mode {
            FlagMode::Flag => {
                let hdu = fits_open_hdu(&mut self.fptr, "FLAGS")?;
                Values::Flag(self.flag_image(&hdu)?)
            }
            FlagMode::Metric => {
                let hdu = fits_open_hdu(&mut self.fptr, "METRIC")?;
                let metric = self.image(&hdu)?;
                let hdu = fits_open_hdu(&mut self.fptr, "WEIGHTS")?;
                let weights = self.image(&hdu)?;
                let weights_square = match fits_open_optional_hdu(&mut self.fptr, "WEIGHTSSQ") {
                    Some(hdu) => Some(self.image(&hdu)?),
                    None => None,
                };
                Values::Metric {
                    metric,
                    weights,
                    weights_square,
                }
            }
        };
        Ok(values)
    }

    fn telescope(&mut self, primary: &FitsHdu) -> Result<Telescope, FlagReadError> {
        let fptr = &mut self.fptr;
        let mut tel = Telescope {
            name: fits_get_optional_key(fptr, primary, "TELNAME")?,
            instrument: fits_get_optional_key(fptr, primary, "INSTRUME")?,
            feed_array: fits_get_optional_key::<String>(fptr, primary, "FEEDS")?
                .map(|f| f.split(',').map(|s| s.trim().to_string()).collect()),
            ..Default::default()
        };
        let lat: Option<f64> = fits_get_optional_key(fptr, primary, "TELLAT")?;
        let lon: Option<f64> = fits_get_optional_key(fptr, primary, "TELLON")?;
        let alt: Option<f64> = fits_get_optional_key(fptr, primary, "TELALT")?;
        if let (Some(lat), Some(lon), Some(alt)) = (lat, lon, alt) {
            tel.location = Some(LatLngHeight {
                longitude_rad: lon.to_radians(),
                latitude_rad: lat.to_radians(),
                height_metres: alt,
            });
        }

        let hdu = match fits_open_optional_hdu(fptr, "TELANTS") {
            Some(hdu) => hdu,
            None => return Ok(tel),
        };
        tel.antenna_numbers = Some(from_i32(
            fits_get_col(fptr, &hdu, "Number")?,
            "antenna number",
            &self.file,
        )?);
        if fits_has_col(&hdu, "Name") {
            tel.antenna_names = Some(fits_get_col(fptr, &hdu, "Name")?);
        }
        if ["X", "Y", "Z"].iter().all(|c| fits_has_col(&hdu, c)) {
            let x: Vec<f64> = fits_get_col(fptr, &hdu, "X")?;
            let y: Vec<f64> = fits_get_col(fptr, &hdu, "Y")?;
            let z: Vec<f64> = fits_get_col(fptr, &hdu, "Z")?;
            tel.antenna_positions = Some(
                x.into_iter()
                    .zip(y)
                    .zip(z)
                    .map(|((x, y), z)| XyzGeodetic { x, y, z })
                    .collect(),
            );
        }
        if fits_has_col(&hdu, "Diameter") {
            tel.antenna_diameters = Some(fits_get_col(fptr, &hdu, "Diameter")?);
        }
        if fits_has_col(&hdu, "Mount") {
            tel.mount_type = Some(fits_get_col(fptr, &hdu, "Mount")?);
        }
        Ok(tel)
    }
}

impl FlagSet {
    /// Read a flag object from a FITS file written by [`FlagSet::write`].
    ///
    /// Size counters, channel widths, spectral windows, LSTs and telescope
    /// antennas are recomputed (with a warning) if the file lacks them.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<FlagSet, FlagReadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FlagReadError::NotFound(path.display().to_string()));
        }
        debug!("Reading flags from {}", path.display());
        let mut r = Reader {
            fptr: fits_open(path)?,
            file: path.display().to_string(),
        };
        let primary = fits_open_hdu(&mut r.fptr, 0)?;

        let type_str: String = fits_get_required_key(&mut r.fptr, &primary, "TYPE")?;
        let flag_type = FlagType::from_str(&type_str).map_err(|_| FlagReadError::BadType(type_str))?;
        let mode_str: String = fits_get_required_key(&mut r.fptr, &primary, "MODE")?;
        let mode = FlagMode::from_str(&mode_str).map_err(|_| FlagReadError::BadMode(mode_str))?;
        let label = fits_get_optional_key_long_string(&mut r.fptr, &primary, "LABEL")?
            .unwrap_or_default();
        let pol_collapsed = fits_get_optional_key::<String>(&mut r.fptr, &primary, "POLCOLL")?
            .map(|s| s.eq_ignore_ascii_case("Y"))
            .unwrap_or(false);
        let telescope = r.telescope(&primary)?;

        let mut history = History::new();
        if let Some(hdu) = fits_open_optional_hdu(&mut r.fptr, "HISTORY") {
            for entry in fits_get_col::<String>(&mut r.fptr, &hdu, "Entry")? {
                history.push(entry);
            }
        }
        history.add_version();

        let mut extra_keywords = IndexMap::new();
        if let Some(hdu) = fits_open_optional_hdu(&mut r.fptr, "EXTRAKEYS") {
            let keys: Vec<String> = fits_get_col(&mut r.fptr, &hdu, "Key")?;
            let values: Vec<String> = fits_get_col(&mut r.fptr, &hdu, "Value")?;
            for (key, value) in keys.into_iter().zip(values) {
                let value = serde_json::from_str(&value)
                    .map_err(|err| FlagReadError::ExtraKeyword {
                        key: key.clone(),
                        err,
                    })?;
                extra_keywords.insert(key, value);
            }
        }

        // Times
        let hdu = fits_open_hdu(&mut r.fptr, "TIMES")?;
        let time_array: Vec<f64> = fits_get_col(&mut r.fptr, &hdu, "Time")?;
        let lst_array: Option<Vec<f64>> = if fits_has_col(&hdu, "Lst") {
            Some(fits_get_col(&mut r.fptr, &hdu, "Lst")?)
        } else {
            None
        };

        // Frequencies and spectral windows
        let hdu = fits_open_hdu(&mut r.fptr, "FREQS")?;
        let freq_array: Vec<f64> = fits_get_col(&mut r.fptr, &hdu, "Freq")?;
        let channel_width = if fits_has_col(&hdu, "Width") {
            fits_get_col(&mut r.fptr, &hdu, "Width")?
        } else {
            warn!("channel_width not available in file, computing it from the freq_array spacing.");
            widths_from_spacing(&freq_array)
                .ok_or_else(|| FlagReadError::NoChannelWidth(r.file.clone()))?
        };
        let flex_spw_id_array: Vec<i32> = if fits_has_col(&hdu, "SpwId") {
            fits_get_col(&mut r.fptr, &hdu, "SpwId")?
        } else {
            warn!("flex_spw_id_array not available in file, assuming a single spectral window.");
            vec![0; freq_array.len()]
        };
        let spw_array: Vec<i32> = match fits_open_optional_hdu(&mut r.fptr, "SPWS") {
            Some(hdu) => fits_get_col(&mut r.fptr, &hdu, "Spw")?,
            None => {
                warn!("spw_array not available in file, computing it from the flex_spw_id_array.");
                let mut spws = flex_spw_id_array.clone();
                spws.sort_unstable();
                spws.dedup();
                if spws.is_empty() {
                    spws.push(0);
                }
                spws
            }
        };

        // Polarisations
        let hdu = fits_open_hdu(&mut r.fptr, "POLS")?;
        let polarization_array = if pol_collapsed {
            let labels: Vec<String> = fits_get_col(&mut r.fptr, &hdu, "PolLabel")?;
            Polarizations::Collapsed(labels.into_iter().next().unwrap_or_default())
        } else {
            Polarizations::Codes(fits_get_col(&mut r.fptr, &hdu, "Pol")?)
        };

        let data = match flag_type {
            FlagType::Baseline => {
                let hdu = fits_open_hdu(&mut r.fptr, "BASELINES")?;
                let ant_1_array = from_i32(
                    fits_get_col(&mut r.fptr, &hdu, "Ant1")?,
                    "antenna number",
                    &r.file,
                )?;
                let ant_2_array = from_i32(
                    fits_get_col(&mut r.fptr, &hdu, "Ant2")?,
                    "antenna number",
                    &r.file,
                )?;
                let baseline_array = from_i32(
                    fits_get_col(&mut r.fptr, &hdu, "Baseline")?,
                    "baseline number",
                    &r.file,
                )?;
                FlagData::Baseline {
                    ant_1_array,
                    ant_2_array,
                    baseline_array,
                    values: r.values(mode)?,
                }
            }
            FlagType::Antenna => {
                let hdu = fits_open_hdu(&mut r.fptr, "ANTS")?;
                let ant_array = from_i32(
                    fits_get_col(&mut r.fptr, &hdu, "Ant")?,
                    "antenna number",
                    &r.file,
                )?;
                FlagData::Antenna {
                    ant_array,
                    values: r.values(mode)?,
                }
            }
            FlagType::Waterfall => FlagData::Waterfall {
                values: r.values(mode)?,
            },
        };

        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| r.file.clone());
        let mut flags = FlagSet {
            data,
            lst_array: lst_array.clone().unwrap_or_default(),
            time_array,
            freq_array,
            channel_width,
            spw_array,
            flex_spw_id_array,
            polarization_array,
            telescope,
            history,
            label,
            extra_keywords,
            filename: vec![filename],
        };

        let lst_task = match lst_array {
            Some(_) => None,
            None => {
                warn!("lst_array not available in file, computing it from the time_array.");
                Some(flags.spawn_lst_update()?)
            }
        };

        for (key, computed) in [
            ("NTIMES", Some(flags.ntimes())),
            ("NFREQS", Some(flags.nfreqs())),
            ("NPOLS", Some(flags.npols())),
            ("NSPWS", Some(flags.nspws())),
            ("NBLTS", flags.nblts()),
            ("NBLS", flags.nbls()),
            ("NANTSDAT", flags.ant_rows().map(|a| a.len())),
        ] {
            let in_file = fits_get_optional_key(&mut r.fptr, &primary, key)?;
            check_counter(key, in_file, computed);
        }

        if flags.telescope.antenna_numbers.is_none() && flags.flag_type() != FlagType::Waterfall {
            warn!("antenna_numbers not available in file, using the antennas with data.");
            flags.telescope.antenna_numbers = Some(flags.get_ants()?);
        }

        if let Some(task) = lst_task {
            task.join_into(&mut flags)?;
        }
        flags.check()?;
        Ok(flags)
    }

    /// Read several flag files and combine them, in order, into one object.
    /// Each file is joined along the first axis on which its coordinates
    /// differ from what has been read so far, or along the
    /// [default axis](FlagSet::default_axis) if nothing differs.
    pub fn read_many<P: AsRef<Path>>(paths: &Vec1<P>) -> Result<FlagSet, FlagReadError> {
        let (first, rest) = (paths.first(), &paths[1..]);
        let mut flags = FlagSet::read(first)?;
        for path in rest {
            let other = FlagSet::read(path)?;
            let axis = differing_axis(&flags, &other);
            debug!(
                "Adding {} along the {} axis",
                path.as_ref().display(),
                axis.unwrap_or_else(|| flags.default_axis())
            );
            flags.add_inplace(&other, axis)?;
        }
        Ok(flags)
    }
}

/// The first axis along which two objects' coordinates differ. Baseline-type
/// objects repeat times and baselines, so only the unique values count.
fn differing_axis(this: &FlagSet, other: &FlagSet) -> Option<FlagAxis> {
    let differs = |a: &[f64], b: &[f64], tol| a.len() != b.len() || !all_close(a, b, tol);
    if differs(
        &unique_f64(&this.time_array),
        &unique_f64(&other.time_array),
        TIME_TOL,
    ) {
        return Some(FlagAxis::Time);
    }
    match (&this.data, &other.data) {
        (FlagData::Baseline { .. }, FlagData::Baseline { .. }) => {
            if this.get_baseline_nums().ok() != other.get_baseline_nums().ok() {
                return Some(FlagAxis::Baseline);
            }
        }
        (FlagData::Antenna { ant_array: a, .. }, FlagData::Antenna { ant_array: b, .. })
            if a != b =>
        {
            return Some(FlagAxis::Antenna)
        }
        _ => (),
    }
    if differs(&this.freq_array, &other.freq_array, FREQ_TOL) {
        return Some(FlagAxis::Frequency);
    }
    if this.polarization_array != other.polarization_array {
        return Some(FlagAxis::Polarization);
    }
    None
}
