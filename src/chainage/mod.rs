//! Chainage notation (`K23+066`) and location matching between RFIs and objections.

pub mod matching;
pub mod parse;

pub use matching::{select_matching, ChainageScope, Located, MatchType};
pub use parse::{
    parse, parse_list, parse_list_lenient, parse_location, parse_point, parse_range,
    range_from_bounds, Chainage, ChainageError, ChainageRange, Location, Side,
};
