// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading and writing flag files.

use thiserror::Error;

use super::{fits::FitsError, glob::GlobError};
use crate::flags::FlagError;

#[derive(Error, Debug)]
pub enum FlagReadError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("File cannot be read. Received mode \"{0}\"")]
    BadMode(String),

    #[error("File cannot be read. Received type \"{0}\"")]
    BadType(String),

    #[error("{file} contains a negative {what} ({value})")]
    Negative {
        file: String,
        what: &'static str,
        value: i32,
    },

    #[error("{0} has a single channel and no channel widths, so they can't be computed")]
    NoChannelWidth(String),

    #[error("Extra keyword {key} could not be parsed: {err}")]
    ExtraKeyword {
        key: String,
        err: serde_json::Error,
    },

    #[error("The data images of {file} don't have the expected shape: {err}")]
    Shape {
        file: String,
        err: ndarray::ShapeError,
    },

    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Flag(#[from] FlagError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum FlagWriteError {
    #[error("File {0} exists; skipping")]
    Exists(String),

    #[error("{what} {value} is too large to be written")]
    TooLarge { what: &'static str, value: u64 },

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),

    #[error(transparent)]
    Flag(#[from] FlagError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
