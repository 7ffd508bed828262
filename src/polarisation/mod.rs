// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Polarisation (and Jones) codes.
//!
//! The integer codes follow the AIPS memo 117 convention: 1 to 4 are the Stokes
//! parameters, -1 to -4 are the circular products and -5 to -8 are the linear
//! products. Calibration Jones terms use the same numbers.


use itertools::Itertools;

const POL_CODES: [(i32, &str); 12] = [
    (1, "pI"),
    (2, "pQ"),
    (3, "pU"),
    (4, "pV"),
    (-1, "rr"),
    (-2, "ll"),
    (-3, "rl"),
    (-4, "lr"),
    (-5, "xx"),
    (-6, "yy"),
    (-7, "xy"),
    (-8, "yx"),
];

/// Convert a polarisation code into its string form, e.g. -5 is "xx".
pub fn pol_num_to_str(code: i32) -> Option<&'static str> {
    POL_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
}

/// Convert a polarisation string into its code, e.g. "yy" is -6. Matching is
/// case insensitive, and the linear products may also be given with a "j"
/// prefix (e.g. "jxx") as used by calibration solutions.
pub fn pol_str_to_num(s: &str) -> Option<i32> {
    let s = s.trim();
    let s = s
        .strip_prefix('j')
        .or_else(|| s.strip_prefix('J'))
        .unwrap_or(s);
    POL_CODES
        .iter()
        .find(|(_, p)| p.eq_ignore_ascii_case(s))
        .map(|(c, _)| *c)
}

/// The polarisation axis of a flag object.
///
/// Normally this is a list of polarisation codes. After the polarisation axis
/// has been collapsed, it is a single composite label, e.g. "-5,-6".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polarizations {
    Codes(Vec<i32>),
    Collapsed(String),
}

impl Default for Polarizations {
    fn default() -> Self {
        Polarizations::Codes(vec![])
    }
}

impl Polarizations {
    /// The number of entries on the polarisation axis.
    pub fn len(&self) -> usize {
        match self {
            Polarizations::Codes(c) => c.len(),
            Polarizations::Collapsed(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, Polarizations::Collapsed(_))
    }

    pub fn codes(&self) -> Option<&[i32]> {
        match self {
            Polarizations::Codes(c) => Some(c),
            Polarizations::Collapsed(_) => None,
        }
    }

    /// Get a label for each entry on the polarisation axis. Codes are rendered
    /// as their numbers.
    pub fn labels(&self) -> Vec<String> {
        match self {
            Polarizations::Codes(c) => c.iter().map(|c| c.to_string()).collect(),
            Polarizations::Collapsed(l) => vec![l.clone()],
        }
    }

    /// Get the string forms (e.g. "xx") of the entries. Unknown codes and
    /// collapsed labels are rendered verbatim.
    pub fn names(&self) -> Vec<String> {
        match self {
            Polarizations::Codes(c) => c
                .iter()
                .map(|&c| {
                    pol_num_to_str(c)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| c.to_string())
                })
                .collect(),
            Polarizations::Collapsed(l) => vec![l.clone()],
        }
    }

    /// Collapse this axis into one composite label.
    pub(crate) fn collapsed(&self) -> Polarizations {
        match self {
            Polarizations::Codes(c) => Polarizations::Collapsed(c.iter().join(",")),
            Polarizations::Collapsed(l) => Polarizations::Collapsed(l.clone()),
        }
    }

    /// If this axis was collapsed from polarisation codes, get those codes
    /// back.
    pub(crate) fn uncollapsed_codes(&self) -> Option<Vec<i32>> {
        match self {
            Polarizations::Codes(_) => None,
            Polarizations::Collapsed(l) => l
                .split(',')
                .map(|p| p.trim().parse::<i32>().ok())
                .collect(),
        }
    }

    /// Keep only the entries at the supplied indices.
    pub(crate) fn select(&self, indices: &[usize]) -> Polarizations {
        match self {
            Polarizations::Codes(c) => {
                Polarizations::Codes(indices.iter().map(|&i| c[i]).collect())
            }
            Polarizations::Collapsed(l) => Polarizations::Collapsed(l.clone()),
        }
    }
}
