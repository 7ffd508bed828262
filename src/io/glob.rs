// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Functions to glob files.

use std::path::PathBuf;

use glob::glob;
use thiserror::Error;
use vec1::Vec1;

/// Given a glob pattern, get all of the matches from the filesystem.
pub(crate) fn get_all_matches_from_glob(g: &str) -> Result<Vec<PathBuf>, GlobError> {
    let mut entries = vec![];
    for entry in glob(g)? {
        entries.push(entry?);
    }
    Ok(entries)
}

/// Expand each input into the files it refers to. Inputs that aren't globs,
/// or globs that match nothing, are kept as they are so that a later attempt
/// to open them produces a useful error. Input order is preserved; matches of
/// a single glob are sorted.
pub fn expand_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<Vec1<PathBuf>, GlobError> {
    let mut files = vec![];
    for input in inputs {
        let input = input.as_ref();
        let matches = get_all_matches_from_glob(input)?;
        if matches.is_empty() {
            files.push(PathBuf::from(input));
        } else {
            files.extend(matches);
        }
    }
    Vec1::try_from_vec(files).map_err(|_| GlobError::NoInputs)
}

#[derive(Error, Debug)]
/// Error type associated with glob helper functions.
pub enum GlobError {
    #[error("No input files were given")]
    NoInputs,

    #[error(transparent)]
    GlobCrate(#[from] glob::GlobError),

    #[error(transparent)]
    PatternError(#[from] glob::PatternError),
}
