// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parsing antenna strings.
//!
//! An antenna string is a comma-separated list of items. An item is one of:
//!
//! - `all`, `auto` or `cross` (only on their own);
//! - an antenna, e.g. `4`, meaning every baseline with that antenna;
//! - an antenna pair, e.g. `4_5`;
//! - a parenthesised list on either side of a pair, e.g. `(1,2)_3`.
//!
//! Antennas may carry a polarisation letter (`x`, `y`, `r` or `l`), e.g.
//! `4x_5y`, which also selects the corresponding polarisation. An item
//! starting with `-` removes baselines from the selection.

use lazy_static::lazy_static;
use log::trace;
use regex::Regex;

use crate::flags::{FlagError, FlagSet, FlagType};

lazy_static! {
    static ref ANT_TOKEN: Regex = Regex::new(r"^(\d+)([xylrXYLR])?$").unwrap();
}

type Antenna = (u32, Option<char>);

/// Split on a character, ignoring anything inside parentheses.
fn split_top_level(s: &str, sep: char) -> Option<Vec<&str>> {
    let mut parts = vec![];
    let mut depth = 0_i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => (),
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&s[start..]);
    Some(parts)
}

/// Parse one side of a pair, e.g. "4x" or "(1,2y)".
fn parse_side(side: &str) -> Option<Vec<Antenna>> {
    let side = side.trim();
    let inner = match side.strip_prefix('(') {
        Some(rest) => rest.strip_suffix(')')?,
        None => side,
    };
    inner
        .split(',')
        .map(|tok| {
            let caps = ANT_TOKEN.captures(tok.trim())?;
            let ant = caps.get(1)?.as_str().parse().ok()?;
            let pol = caps
                .get(2)
                .and_then(|m| m.as_str().chars().next())
                .map(|c| c.to_ascii_lowercase());
            Some((ant, pol))
        })
        .collect()
}

impl FlagSet {
    /// Turn an antenna string into the antenna pairs and polarisations it
    /// refers to. Only baseline-type objects can do this.
    ///
    /// `(None, None)` means everything (i.e. "all"). The antenna pairs are in
    /// the order that they appear in the data; pairs are matched regardless of
    /// the order of their antennas.
    #[allow(clippy::type_complexity)]
    pub fn parse_ants(
        &self,
        ant_str: &str,
    ) -> Result<(Option<Vec<(u32, u32)>>, Option<Vec<String>>), FlagError> {
        if self.flag_type() != FlagType::Baseline {
            return Err(FlagError::ParseAntsType);
        }
        let antpairs = self.get_antpairs()?;
        let data_pols = self.get_pols();
        let no_match = || FlagError::AntStrNoMatch(ant_str.to_string());

        let trimmed = ant_str.trim();
        let keyword_pairs: Option<Vec<(u32, u32)>> = match trimmed.to_lowercase().as_str() {
            "all" => return Ok((None, None)),
            "auto" => Some(antpairs.iter().copied().filter(|(a1, a2)| a1 == a2).collect()),
            "cross" => Some(antpairs.iter().copied().filter(|(a1, a2)| a1 != a2).collect()),
            _ => None,
        };
        if let Some(pairs) = keyword_pairs {
            if pairs.is_empty() {
                return Err(no_match());
            }
            return Ok((Some(pairs), None));
        }

        let bad = |item: &str| FlagError::BadAntStr(item.to_string());
        let items = split_top_level(trimmed, ',').ok_or_else(|| bad(trimmed))?;
        let mut keep: Vec<(u32, u32)> = vec![];
        let mut discard: Vec<(u32, u32)> = vec![];
        let mut any_positive = false;
        let mut pols: Vec<String> = vec![];

        for item in items {
            let item = item.trim();
            let (negate, body) = match item.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, item),
            };
            let sides = split_top_level(body, '_').ok_or_else(|| bad(item))?;
            let mut matched: Vec<(u32, u32)> = vec![];
            match sides.as_slice() {
                [single] => {
                    for (ant, pol) in parse_side(single).ok_or_else(|| bad(item))? {
                        matched.extend(
                            antpairs
                                .iter()
                                .copied()
                                .filter(|&(a1, a2)| a1 == ant || a2 == ant),
                        );
                        if let (Some(p), false) = (pol, negate) {
                            pols.extend(data_pols.iter().filter(|name| name.contains(p)).cloned());
                        }
                    }
                }
                [left, right] => {
                    let left = parse_side(left).ok_or_else(|| bad(item))?;
                    let right = parse_side(right).ok_or_else(|| bad(item))?;
                    for &(a, pa) in &left {
                        for &(b, pb) in &right {
                            let pol = match (pa, pb) {
                                (Some(pa), Some(pb)) => Some((pa, pb)),
                                (None, None) => None,
                                _ => return Err(bad(item)),
                            };
                            let found = if antpairs.contains(&(a, b)) {
                                Some(((a, b), pol))
                            } else if antpairs.contains(&(b, a)) {
                                Some(((b, a), pol.map(|(pa, pb)| (pb, pa))))
                            } else {
                                None
                            };
                            if let Some((pair, pol)) = found {
                                matched.push(pair);
                                if let (Some((p1, p2)), false) = (pol, negate) {
                                    pols.push(format!("{p1}{p2}"));
                                }
                            }
                        }
                    }
                }
                _ => return Err(bad(item)),
            }

            trace!("ant_str item '{item}' matched {} antenna pairs", matched.len());
            if negate {
                discard.extend(matched);
            } else {
                any_positive = true;
                keep.extend(matched);
            }
        }

        let pairs: Vec<(u32, u32)> = antpairs
            .into_iter()
            .filter(|pair| (!any_positive || keep.contains(pair)) && !discard.contains(pair))
            .collect();
        if pairs.is_empty() {
            return Err(no_match());
        }
        let mut unique_pols: Vec<String> = vec![];
        for p in pols {
            if !unique_pols.contains(&p) {
                unique_pols.push(p);
            }
        }
        Ok((
            Some(pairs),
            (!unique_pols.is_empty()).then_some(unique_pols),
        ))
    }
}
