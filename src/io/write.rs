// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writing flag objects to FITS files.

use std::path::Path;

use fitsio::{
    images::ImageType,
    tables::{ColumnDataType, ColumnDescription, ConcreteColumnDescription},
    FitsFile,
};
use log::{debug, trace};

use super::{
    fits::{
        fits_create, fits_create_table, fits_open_hdu, fits_write_col, fits_write_image,
        fits_write_key, fits_write_key_long_string,
    },
    FlagWriteError,
};
use crate::{
    flags::{FlagData, FlagSet},
    polarisation::Polarizations,
};

fn col(name: &str, data_type: ColumnDataType) -> Result<ConcreteColumnDescription, FlagWriteError> {
    Ok(ColumnDescription::new(name).with_type(data_type).create()?)
}

/// A fixed-width string column wide enough for all of the strings.
fn string_col(name: &str, strings: &[String]) -> Result<ConcreteColumnDescription, FlagWriteError> {
    let width = strings.iter().map(|s| s.len()).max().unwrap_or(0).max(1);
    Ok(ColumnDescription::new(name)
        .with_type(ColumnDataType::String)
        .that_repeats(width)
        .create()?)
}

fn to_i32<T: Copy + Into<u64>>(values: &[T], what: &'static str) -> Result<Vec<i32>, FlagWriteError> {
    values
        .iter()
        .map(|&v| {
            let v: u64 = v.into();
            i32::try_from(v).map_err(|_| FlagWriteError::TooLarge { what, value: v })
        })
        .collect()
}

impl FlagSet {
    /// Write this flag object to a FITS file. An existing file is only
    /// replaced if `clobber` is true.
    ///
    /// The object is checked before anything is touched on disk. This
    /// crate's version tag is added to the object's history (if it isn't
    /// already there) and written with it.
    pub fn write<P: AsRef<Path>>(&mut self, path: P, clobber: bool) -> Result<(), FlagWriteError> {
        let path = path.as_ref();
        if path.exists() && !clobber {
            return Err(FlagWriteError::Exists(path.display().to_string()));
        }
        self.check()?;
        self.history.add_version();
        if path.exists() {
            debug!("Removing existing file {}", path.display());
            std::fs::remove_file(path)?;
        }

        let mut fptr = fits_create(path)?;
        self.write_primary_keys(&mut fptr)?;
        self.write_history_and_extra_keys(&mut fptr)?;
        self.write_axes(&mut fptr)?;
        self.write_rows(&mut fptr)?;
        self.write_telescope_antennas(&mut fptr)?;
        self.write_data(&mut fptr)?;

        debug!(
            "Wrote a {} type {} mode flag object to {}",
            self.flag_type(),
            self.mode(),
            path.display()
        );
        Ok(())
    }

    fn write_primary_keys(&self, fptr: &mut FitsFile) -> Result<(), FlagWriteError> {
        let hdu = fits_open_hdu(fptr, 0)?;
        let flag_type: &'static str = self.flag_type().into();
        let mode: &'static str = self.mode().into();
        fits_write_key(fptr, &hdu, "TYPE", flag_type)?;
        fits_write_key(fptr, &hdu, "MODE", mode)?;
        fits_write_key(fptr, &hdu, "NTIMES", self.ntimes() as i64)?;
        fits_write_key(fptr, &hdu, "NFREQS", self.nfreqs() as i64)?;
        fits_write_key(fptr, &hdu, "NPOLS", self.npols() as i64)?;
        fits_write_key(fptr, &hdu, "NSPWS", self.nspws() as i64)?;
        if let (Some(nblts), Some(nbls)) = (self.nblts(), self.nbls()) {
            fits_write_key(fptr, &hdu, "NBLTS", nblts as i64)?;
            fits_write_key(fptr, &hdu, "NBLS", nbls as i64)?;
        }
        if let (Some(nants), FlagData::Antenna { .. }) = (self.nants_data(), &self.data) {
            fits_write_key(fptr, &hdu, "NANTSDAT", nants as i64)?;
        }

        let tel = &self.telescope;
        if let Some(name) = &tel.name {
            fits_write_key(fptr, &hdu, "TELNAME", name.as_str())?;
        }
        if let Some(location) = tel.location {
            fits_write_key(fptr, &hdu, "TELLAT", location.latitude_rad.to_degrees())?;
            fits_write_key(fptr, &hdu, "TELLON", location.longitude_rad.to_degrees())?;
            fits_write_key(fptr, &hdu, "TELALT", location.height_metres)?;
        }
        if let Some(instrument) = &tel.instrument {
            fits_write_key(fptr, &hdu, "INSTRUME", instrument.as_str())?;
        }
        if let Some(feeds) = &tel.feed_array {
            fits_write_key(fptr, &hdu, "FEEDS", feeds.join(","))?;
        }

        fits_write_key_long_string(fptr, &hdu, "LABEL", &self.label)?;
        let pol_collapsed = if self.pol_collapsed() { "Y" } else { "N" };
        fits_write_key(fptr, &hdu, "POLCOLL", pol_collapsed)?;
        fits_write_key(
            fptr,
            &hdu,
            "SOFTWARE",
            format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        )?;
        Ok(())
    }

    fn write_history_and_extra_keys(&self, fptr: &mut FitsFile) -> Result<(), FlagWriteError> {
        let entries = self.history.entries();
        let hdu = fits_create_table(fptr, "HISTORY", &[string_col("Entry", entries)?])?;
        fits_write_col(fptr, &hdu, "Entry", entries)?;

        if !self.extra_keywords.is_empty() {
            let keys = self.extra_keywords.keys().cloned().collect::<Vec<_>>();
            let values = self
                .extra_keywords
                .values()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            let hdu = fits_create_table(
                fptr,
                "EXTRAKEYS",
                &[string_col("Key", &keys)?, string_col("Value", &values)?],
            )?;
            fits_write_col(fptr, &hdu, "Key", &keys)?;
            fits_write_col(fptr, &hdu, "Value", &values)?;
        }
        Ok(())
    }

    /// Times, frequencies, spectral windows and polarisations.
    fn write_axes(&self, fptr: &mut FitsFile) -> Result<(), FlagWriteError> {
        let hdu = fits_create_table(
            fptr,
            "TIMES",
            &[
                col("Time", ColumnDataType::Double)?,
                col("Lst", ColumnDataType::Double)?,
            ],
        )?;
        fits_write_col(fptr, &hdu, "Time", &self.time_array)?;
        fits_write_col(fptr, &hdu, "Lst", &self.lst_array)?;

        let hdu = fits_create_table(
            fptr,
            "FREQS",
            &[
                col("Freq", ColumnDataType::Double)?,
                col("Width", ColumnDataType::Double)?,
                col("SpwId", ColumnDataType::Int)?,
            ],
        )?;
        fits_write_col(fptr, &hdu, "Freq", &self.freq_array)?;
        fits_write_col(fptr, &hdu, "Width", &self.channel_width)?;
        fits_write_col(fptr, &hdu, "SpwId", &self.flex_spw_id_array)?;

        let hdu = fits_create_table(fptr, "SPWS", &[col("Spw", ColumnDataType::Int)?])?;
        fits_write_col(fptr, &hdu, "Spw", &self.spw_array)?;

        match &self.polarization_array {
            Polarizations::Codes(codes) => {
                let hdu = fits_create_table(fptr, "POLS", &[col("Pol", ColumnDataType::Int)?])?;
                fits_write_col(fptr, &hdu, "Pol", codes)?;
            }
            Polarizations::Collapsed(label) => {
                let labels = [label.clone()];
                let hdu = fits_create_table(fptr, "POLS", &[string_col("PolLabel", &labels)?])?;
                fits_write_col(fptr, &hdu, "PolLabel", &labels)?;
            }
        }
        Ok(())
    }

    /// The arrays identifying baseline-time or antenna rows.
    fn write_rows(&self, fptr: &mut FitsFile) -> Result<(), FlagWriteError> {
        match &self.data {
            FlagData::Baseline {
                ant_1_array,
                ant_2_array,
                baseline_array,
                ..
            } => {
                let hdu = fits_create_table(
                    fptr,
                    "BASELINES",
                    &[
                        col("Ant1", ColumnDataType::Int)?,
                        col("Ant2", ColumnDataType::Int)?,
                        col("Baseline", ColumnDataType::Int)?,
                    ],
                )?;
                fits_write_col(fptr, &hdu, "Ant1", &to_i32(ant_1_array, "Antenna number")?)?;
                fits_write_col(fptr, &hdu, "Ant2", &to_i32(ant_2_array, "Antenna number")?)?;
                fits_write_col(
                    fptr,
                    &hdu,
                    "Baseline",
                    &to_i32(baseline_array, "Baseline number")?,
                )?;
            }
            FlagData::Antenna { ant_array, .. } => {
                let hdu = fits_create_table(fptr, "ANTS", &[col("Ant", ColumnDataType::Int)?])?;
                fits_write_col(fptr, &hdu, "Ant", &to_i32(ant_array, "Antenna number")?)?;
            }
            FlagData::Waterfall { .. } => (),
        }
        Ok(())
    }

    fn write_telescope_antennas(&self, fptr: &mut FitsFile) -> Result<(), FlagWriteError> {
        let tel = &self.telescope;
        let numbers = match &tel.antenna_numbers {
            Some(n) => to_i32(n, "Antenna number")?,
            None => {
                trace!("No telescope antennas to write");
                return Ok(());
            }
        };

        let mut columns = vec![col("Number", ColumnDataType::Int)?];
        if let Some(names) = &tel.antenna_names {
            columns.push(string_col("Name", names)?);
        }
        if tel.antenna_positions.is_some() {
            for axis in ["X", "Y", "Z"] {
                columns.push(col(axis, ColumnDataType::Double)?);
            }
        }
        if tel.antenna_diameters.is_some() {
            columns.push(col("Diameter", ColumnDataType::Double)?);
        }
        if let Some(mounts) = &tel.mount_type {
            columns.push(string_col("Mount", mounts)?);
        }

        let hdu = fits_create_table(fptr, "TELANTS", &columns)?;
        fits_write_col(fptr, &hdu, "Number", &numbers)?;
        if let Some(names) = &tel.antenna_names {
            fits_write_col(fptr, &hdu, "Name", names)?;
        }
        if let Some(positions) = &tel.antenna_positions {
            let x = positions.iter().map(|p| p.x).collect::<Vec<_>>();
            let y = positions.iter().map(|p| p.y).collect::<Vec<_>>();
            let z = positions.iter().map(|p| p.z).collect::<Vec<_>>();
            fits_write_col(fptr, &hdu, "X", &x)?;
            fits_write_col(fptr, &hdu, "Y", &y)?;
            fits_write_col(fptr, &hdu, "Z", &z)?;
        }
        if let Some(diameters) = &tel.antenna_diameters {
            fits_write_col(fptr, &hdu, "Diameter", diameters)?;
        }
        if let Some(mounts) = &tel.mount_type {
            fits_write_col(fptr, &hdu, "Mount", mounts)?;
        }
        Ok(())
    }

    fn write_data(&self, fptr: &mut FitsFile) -> Result<(), FlagWriteError> {
        let shape = self.data.shape().to_vec();
        if let Some(flags) = self.flag_array() {
            let bytes: Vec<u8> = flags.iter().map(|&f| u8::from(f)).collect();
            fits_write_image(fptr, "FLAGS", ImageType::UnsignedByte, &shape, &bytes)?;
            return Ok(());
        }

        let images = [
            ("METRIC", self.metric_array()),
            ("WEIGHTS", self.weights_array()),
            ("WEIGHTSSQ", self.weights_square_array()),
        ];
        for (name, array) in images {
            if let Some(array) = array {
                let data = array.iter().copied().collect::<Vec<f64>>();
                fits_write_image(fptr, name, ImageType::Double, &shape, &data)?;
            }
        }
        Ok(())
    }
}
