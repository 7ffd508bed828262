// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all hyperflag-related errors. This should be the *only*
//! error enum that is publicly visible from the command line.

use thiserror::Error;

use crate::{
    flags::FlagError,
    io::{FlagReadError, FlagWriteError, GlobError},
};

const URL: &str = env!("CARGO_PKG_REPOSITORY");

/// The *only* publicly visible error from hyperflag. Each error message should
/// include the URL, unless it's "generic".
#[derive(Error, Debug)]
pub enum HyperflagError {
    /// An error with the contents of flag objects, e.g. mismatched arrays, or
    /// objects that can't be converted or combined.
    #[error("{0}\n\nSee for more info: {URL}#flag-objects")]
    Flags(String),

    /// An error related to selecting parts of a flag object.
    #[error("{0}\n\nSee for more info: {URL}#selecting")]
    Select(String),

    /// An error related to the contents of flag files.
    #[error("{0}\n\nSee for more info: {URL}#flag-files")]
    FlagFile(String),

    /// A cfitsio error. Because these are usually quite spartan, some
    /// suggestions are provided here.
    #[error("cfitsio error: {0}\n\nIf you don't know what this means, try turning up verbosity (-v or -vv).")]
    Cfitsio(String),

    /// A generic error that can't be clarified further with documentation, e.g.
    /// IO errors.
    #[error("{0}")]
    Generic(String),
}

/// Problems with command-line arguments that the library can't know about.
#[derive(Error, Debug)]
pub(crate) enum CliArgsError {
    #[error("Expected a single input file, but {0} matched")]
    MoreThanOneInput(usize),

    #[error("At least {expected} input files are needed, but only {got} were given")]
    TooFewInputs { expected: usize, got: usize },

    #[error("--to-flag and --to-metric can't be used together")]
    ConflictingModes,

    #[error("--axis can't be used with --rms")]
    AxisWithRms,
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<CliArgsError> for HyperflagError {
    fn from(e: CliArgsError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<FlagError> for HyperflagError {
    fn from(e: FlagError) -> Self {
        let s = e.to_string();
        match e {
            FlagError::SelectOnWaterfall(_)
            | FlagError::SelectNeedsBaselineType(_)
            | FlagError::BltIndsTooLarge
            | FlagError::BltIndsNegative
            | FlagError::NoMatchingBlts
            | FlagError::NotPresent { .. }
            | FlagError::EmptyAntennaSelection
            | FlagError::EmptyTimeSelection
            | FlagError::EmptyFreqSelection
            | FlagError::EmptyPolSelection
            | FlagError::PolTuplesWithInvert
            | FlagError::AntStrWithOthers
            | FlagError::AntStrNoMatch(_)
            | FlagError::AntStrPolsWithInvert
            | FlagError::BadAntStr(_)
            | FlagError::ParseAntsType => Self::Select(s),
            FlagError::IO(_) => Self::Generic(s),
            _ => Self::Flags(s),
        }
    }
}

impl From<FlagReadError> for HyperflagError {
    fn from(e: FlagReadError) -> Self {
        let s = e.to_string();
        match e {
            FlagReadError::NotFound(_) | FlagReadError::IO(_) | FlagReadError::Glob(_) => {
                Self::Generic(s)
            }
            FlagReadError::Fits(_) => Self::Cfitsio(s),
            FlagReadError::Flag(e) => Self::from(e),
            FlagReadError::BadMode(_)
            | FlagReadError::BadType(_)
            | FlagReadError::Negative { .. }
            | FlagReadError::NoChannelWidth(_)
            | FlagReadError::ExtraKeyword { .. }
            | FlagReadError::Shape { .. } => Self::FlagFile(s),
        }
    }
}

impl From<FlagWriteError> for HyperflagError {
    fn from(e: FlagWriteError) -> Self {
        let s = e.to_string();
        match e {
            FlagWriteError::Exists(_) | FlagWriteError::IO(_) => Self::Generic(s),
            FlagWriteError::Fits(_) | FlagWriteError::Fitsio(_) => Self::Cfitsio(s),
            FlagWriteError::Flag(e) => Self::from(e),
            FlagWriteError::TooLarge { .. } | FlagWriteError::Json(_) => Self::FlagFile(s),
        }
    }
}

impl From<GlobError> for HyperflagError {
    fn from(e: GlobError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<std::io::Error> for HyperflagError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
