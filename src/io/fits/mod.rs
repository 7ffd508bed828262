// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions for reading and writing FITS files.
//!
//! Every helper is `#[track_caller]`, so errors point at the code that asked
//! for the FITS operation rather than at this module.

mod error;

pub use error::FitsError;

use std::{
    ffi::{CStr, CString},
    fmt::Display,
    panic::Location,
    path::Path,
    ptr,
};

use fitsio::{
    hdu::{FitsHdu, HduInfo},
    images::{ImageDescription, ImageType},
    tables::ConcreteColumnDescription,
    FitsFile,
};

fn fitsio_error(
    fits_fptr: &FitsFile,
    hdu_description: impl Display,
    e: fitsio::errors::Error,
    caller: &'static Location<'static>,
) -> FitsError {
    FitsError::Fitsio {
        fits_error: Box::new(e),
        fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
        hdu_description: hdu_description.to_string().into_boxed_str(),
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    }
}

fn open_error(
    file: &Path,
    e: fitsio::errors::Error,
    caller: &'static Location<'static>,
) -> FitsError {
    FitsError::Open {
        fits_error: Box::new(e),
        fits_filename: file.to_path_buf().into_boxed_path(),
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    }
}

fn is_missing_key(e: &fitsio::errors::Error) -> bool {
    matches!(e, fitsio::errors::Error::Fits(fe) if fe.status == 202 || fe.status == 204)
}

/// Open a fits file for reading.
#[track_caller]
pub(crate) fn fits_open<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    let caller = Location::caller();
    FitsFile::open(file.as_ref()).map_err(|e| open_error(file.as_ref(), e, caller))
}

/// Create a new fits file with an empty primary HDU. The file must not
/// already exist.
#[track_caller]
pub(crate) fn fits_create<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    let caller = Location::caller();
    FitsFile::create(file.as_ref())
        .open()
        .map_err(|e| open_error(file.as_ref(), e, caller))
}

/// Open a fits file's HDU.
#[track_caller]
pub(crate) fn fits_open_hdu<T: fitsio::hdu::DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    hdu_description: T,
) -> Result<FitsHdu, FitsError> {
    let caller = Location::caller();
    fits_fptr
        .hdu(hdu_description)
        .map_err(|e| fitsio_error(fits_fptr, hdu_description, e, caller))
}

/// Open a named HDU, or get `None` if the file doesn't have it.
pub(crate) fn fits_open_optional_hdu(fits_fptr: &mut FitsFile, extname: &str) -> Option<FitsHdu> {
    fits_fptr.hdu(extname).ok()
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword that may
/// or may not exist, pull out the value of the keyword, parsing it into the
/// desired type.
#[track_caller]
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<T>, FitsError> {
    let caller = Location::caller();
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(v) => v,
        Err(e) if is_missing_key(&e) => return Ok(None),
        Err(e) => return Err(fitsio_error(fits_fptr, hdu.number + 1, e, caller)),
    };

    unparsed_value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| FitsError::Parse {
            key: keyword.into(),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_num: hdu.number + 1,
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        })
}

/// Like [`fits_get_optional_key`], but the keyword must exist.
#[track_caller]
pub(crate) fn fits_get_required_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<T, FitsError> {
    let caller = Location::caller();
    fits_get_optional_key(fits_fptr, hdu, keyword)?.ok_or_else(|| FitsError::MissingKey {
        key: keyword.into(),
        fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
        hdu_num: hdu.number + 1,
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    })
}

/// Write a keyword into a HDU's header.
#[track_caller]
pub(crate) fn fits_write_key<T: fitsio::headers::WritesKey>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    value: T,
) -> Result<(), FitsError> {
    let caller = Location::caller();
    hdu.write_key(fits_fptr, keyword, value)
        .map_err(|e| fitsio_error(fits_fptr, hdu.number + 1, e, caller))
}

/// Does this table HDU have a column with this name?
pub(crate) fn fits_has_col(hdu: &FitsHdu, name: &str) -> bool {
    match &hdu.info {
        HduInfo::TableInfo {
            column_descriptions,
            ..
        } => column_descriptions.iter().any(|c| c.name == name),
        _ => false,
    }
}

/// Get a column from a fits file's HDU.
#[track_caller]
pub(crate) fn fits_get_col<T: fitsio::tables::ReadsCol>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Vec<T>, FitsError> {
    let caller = Location::caller();
    hdu.read_col(fits_fptr, keyword)
        .map_err(|e| fitsio_error(fits_fptr, hdu.number + 1, e, caller))
}

/// Create a binary table HDU.
#[track_caller]
pub(crate) fn fits_create_table(
    fits_fptr: &mut FitsFile,
    extname: &str,
    columns: &[ConcreteColumnDescription],
) -> Result<FitsHdu, FitsError> {
    let caller = Location::caller();
    fits_fptr
        .create_table(extname, columns)
        .map_err(|e| fitsio_error(fits_fptr, extname, e, caller))
}

/// Write a column into a table HDU.
#[track_caller]
pub(crate) fn fits_write_col<T: fitsio::tables::WritesCol>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    name: &str,
    data: &[T],
) -> Result<(), FitsError> {
    let caller = Location::caller();
    hdu.write_col(fits_fptr, name, data)
        .map(|_| ())
        .map_err(|e| fitsio_error(fits_fptr, hdu.number + 1, e, caller))
}

/// Given a FITS file pointer, and a keyword to a long string keyword that may
/// or may not exist, pull out the long string of the keyword. This deals with
/// FITSs CONTINUE mechanism by calling a low level fits function.
#[track_caller]
pub(crate) fn fits_get_optional_key_long_string(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<String>, FitsError> {
    let caller = Location::caller();
    let fits_filename = fits_fptr.file_path().to_path_buf();
    let long_string_error = || FitsError::LongString {
        key: keyword.into(),
        fits_filename: fits_filename.clone().into_boxed_path(),
        hdu_num: hdu.number + 1,
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    };
    let keyword_ffi = CString::new(keyword).map_err(|_| long_string_error())?;

    let mut status = 0;
    let mut long_string_ptr = ptr::null_mut();
    // ffgkls = fits_read_key_longstr
    unsafe {
        fitsio_sys::ffgkls(
            fits_fptr.as_raw(),
            keyword_ffi.as_ptr(),
            &mut long_string_ptr,
            ptr::null_mut(),
            &mut status,
        );
    }
    match status {
        0 => {
            let long_string = unsafe { CStr::from_ptr(long_string_ptr) }
                .to_str()
                .map(|s| s.to_string());
            // The status passed to fffree isn't useful.
            // fffree = fits_free_memory
            unsafe {
                fitsio_sys::fffree(long_string_ptr.cast(), &mut 0);
            }
            long_string.map(Some).map_err(|_| long_string_error())
        }
        202 | 204 => Ok(None),
        _ => Err(long_string_error()),
    }
}

/// Write a string keyword that may be longer than a header card, using the
/// CONTINUE convention.
#[track_caller]
pub(crate) fn fits_write_key_long_string(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    keyword: &str,
    value: &str,
) -> Result<(), FitsError> {
    let caller = Location::caller();
    let nul_error = || FitsError::NulByte {
        key: keyword.into(),
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    };
    let keyword_ffi = CString::new(keyword).map_err(|_| nul_error())?;
    let value_ffi = CString::new(value).map_err(|_| nul_error())?;

    // The HDU must be current before writing to it with raw calls.
    fits_open_hdu(fits_fptr, hdu.number)?;
    let mut status = 0;
    // ffpkls = fits_write_key_longstr
    unsafe {
        fitsio_sys::ffpkls(
            fits_fptr.as_raw(),
            keyword_ffi.as_ptr(),
            value_ffi.as_ptr(),
            ptr::null(),
            &mut status,
        );
    }
    if status == 0 {
        return Ok(());
    }
    let e = fitsio::errors::Error::Fits(fitsio::errors::FitsError {
        status,
        message: format!("could not write long string keyword {keyword}"),
    });
    Err(fitsio_error(fits_fptr, hdu.number + 1, e, caller))
}

/// Get the size of the image on the supplied FITS file pointer and HDU.
#[track_caller]
pub(crate) fn fits_get_image_size<'a>(
    fits_fptr: &FitsFile,
    hdu: &'a FitsHdu,
) -> Result<&'a [usize], FitsError> {
    let caller = Location::caller();
    match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => Ok(shape),
        _ => Err(FitsError::NotImage {
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_num: hdu.number + 1,
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }),
    }
}

/// Given a FITS file pointer and a HDU, read the associated image.
#[track_caller]
pub(crate) fn fits_get_image<T: fitsio::images::ReadImage>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<T, FitsError> {
    let caller = Location::caller();
    fits_get_image_size(fits_fptr, hdu)?;
    hdu.read_image(fits_fptr)
        .map_err(|e| fitsio_error(fits_fptr, hdu.number + 1, e, caller))
}

/// Create a new image HDU and write data into it. The data must be in
/// row-major order for the given dimensions.
#[track_caller]
pub(crate) fn fits_write_image<T: fitsio::images::WriteImage>(
    fits_fptr: &mut FitsFile,
    extname: &str,
    data_type: ImageType,
    dimensions: &[usize],
    data: &[T],
) -> Result<(), FitsError> {
    let caller = Location::caller();
    let description = ImageDescription {
        data_type,
        dimensions,
    };
    let hdu = fits_fptr
        .create_image(extname, &description)
        .map_err(|e| fitsio_error(fits_fptr, extname, e, caller))?;
    hdu.write_image(fits_fptr, data)
        .map_err(|e| fitsio_error(fits_fptr, extname, e, caller))
}
