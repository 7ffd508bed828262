// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with flag objects.

use thiserror::Error;

use super::{CollapseMethod, FlagMode, FlagType};
use crate::telescope::TelescopeError;

#[derive(Error, Debug)]
pub enum FlagError {
    #[error("{name} has length {got}, but it should have length {expected}")]
    BadLength {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{name} has shape {got:?}, but it should have shape {expected:?}")]
    BadShape {
        name: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("All antennas in {0} must be in antenna_numbers.")]
    AntennaNotInTelescope(&'static str),

    #[error("All values in the flex_spw_id_array must exist in the spw_array.")]
    UnknownSpw,

    #[error("baseline_array does not match ant_1_array and ant_2_array.")]
    BaselineMismatch,

    #[error("The time_array of a {0} type flag object must not have repeated times.")]
    RepeatedTimes(FlagType),

    #[error("Unknown flag mode: {0}")]
    UnknownMode(String),

    #[error("Input mode must be within acceptable values: metric, flag")]
    BadInputMode,

    #[error("Unknown flag type: {0}")]
    UnknownType(String),

    #[error("Unknown collapse method: {0}")]
    UnknownMethod(String),

    #[error("Axis not recognized, must be one of time, baseline, antenna, frequency, polarization; got {0}")]
    UnknownAxis(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error("Cannot convert from type \"{from}\" to \"{to}\".")]
    BadConversion { from: FlagType, to: FlagType },

    #[error("The reference must be of type \"{expected}\" to convert to type \"{expected}\".")]
    BadReference { expected: FlagType },

    #[error("The freq_array on uv is not the same as the freq_array on this object. The value on this object is {this:?}; the value on uv is {other:?}")]
    FreqMismatch { this: Vec<f64>, other: Vec<f64> },

    #[error("channel_width is not the same on this object and on uv. The value on this object is {this:?}; the value on uv is {other:?}")]
    ChannelWidthMismatch { this: Vec<f64>, other: Vec<f64> },

    #[error("spw_array is not the same on this object and on uv. The value on this object is {this:?}; the value on uv is {other:?}")]
    SpwMismatch { this: Vec<i32>, other: Vec<i32> },

    #[error("flex_spw_id_array is not the same on this object and on uv. The value on this object is {this:?}; the value on uv is {other:?}")]
    FlexSpwMismatch { this: Vec<i32>, other: Vec<i32> },

    #[error("Polarizations could not be made to match.")]
    PolsCouldNotMatch,

    #[error("Polarizations do not match.")]
    PolsDoNotMatch,

    #[error("Flag object of type {this} cannot be combined with object of type {other}.")]
    TypeMismatch { this: FlagType, other: FlagType },

    #[error("Flag object of mode {this} cannot be combined with object of mode {other}.")]
    ModeMismatch { this: FlagMode, other: FlagMode },

    #[error("Flag object of type \"{flag_type}\" cannot be concatenated along {axis} axis.")]
    BadConcatAxis {
        flag_type: FlagType,
        axis: &'static str,
    },

    #[error("weights_square_array optional parameter is missing from {0} object")]
    MissingWeightsSquare(&'static str),

    #[error("These objects have overlapping data along the {0} axis and cannot be combined.")]
    Overlap(&'static str),

    #[error("{0} does not match.")]
    FieldMismatch(&'static str),

    #[error("Cannot select on {0} with waterfall type flag objects.")]
    SelectOnWaterfall(&'static str),

    #[error("Only \"baseline\" mode flag objects may select along the {0} axis")]
    SelectNeedsBaselineType(&'static str),

    #[error("blt_inds contains indices that are too large")]
    BltIndsTooLarge,

    #[error("blt_inds contains indices that are negative")]
    BltIndsNegative,

    #[error("No baseline-times were found that match criteria")]
    NoMatchingBlts,

    #[error("{what} {values} is not present in the {array}")]
    NotPresent {
        what: &'static str,
        values: String,
        array: &'static str,
    },

    #[error("No data matching this antenna selection exists.")]
    EmptyAntennaSelection,

    #[error("No data matching this time selection present in object.")]
    EmptyTimeSelection,

    #[error("No data matching this frequency selection exists.")]
    EmptyFreqSelection,

    #[error("No data matching this polarization selection exists.")]
    EmptyPolSelection,

    #[error("Cannot provide length-3 tuples and also set invert=True.")]
    PolTuplesWithInvert,

    #[error("Cannot provide ant_str with antenna_nums, bls, or polarizations.")]
    AntStrWithOthers,

    #[error("There is no data matching ant_str={0} in this object.")]
    AntStrNoMatch(String),

    #[error("Cannot set invert=True if using ant_str with polarizations.")]
    AntStrPolsWithInvert,

    #[error("Unparsable argument {0}")]
    BadAntStr(String),

    #[error("Flag objects can only call 'parse_ants' function if type is 'baseline'.")]
    ParseAntsType,

    #[error("Flag object must be in \"flag\" mode to use \"or\" function.")]
    OrNeedsFlagMode,

    #[error("Flag arrays do not have the same shape.")]
    FlagShapeMismatch,

    #[error("Flag object and \"others\" must be in \"metric\" mode to use combine_metrics.")]
    CombineNeedsMetricMode,

    #[error("Flag metric array shapes do not match.")]
    MetricShapeMismatch,

    #[error("Flag object of type {0} does not contain antenna pairs to index.")]
    NoAntpairs(FlagType),

    #[error("A waterfall type flag object has no sense of antennas.")]
    WaterfallHasNoAnts,

    #[error("Flag array must align with visibility or calibration data")]
    MisalignedFlags,

    #[error("Can only initialize a flag object from a non-wide-band calibration object.")]
    WideBandCalibration,

    #[error("Cannot copy flags; the input object has no flag_array.")]
    NoFlagsToCopy,

    #[error("The calibration object has a freq_array but no channel_width.")]
    MissingChannelWidth,

    #[error("The {0} collapse method can only be used on flag-mode data.")]
    LogicalCollapseOnMetric(CollapseMethod),

    #[error("The telescope location is not set, so LSTs cannot be computed.")]
    NoTelescopeLocation,

    #[error("The thread computing LSTs panicked.")]
    LstThreadPanicked,

    #[error(transparent)]
    Telescope(#[from] TelescopeError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
