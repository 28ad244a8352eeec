use serde::{Deserialize, Serialize};

use super::parse::{parse_location, Chainage, ChainageRange, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Specific,
    Range,
}

/// The locations an objection is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainageScope {
    pub specific: Vec<Chainage>,
    pub range: Option<ChainageRange>,
}

impl ChainageScope {
    pub fn is_empty(&self) -> bool {
        self.specific.is_empty() && self.range.is_none()
    }

    /// Specific chainages take precedence when both are present.
    pub fn match_type(&self) -> Option<MatchType> {
        if !self.specific.is_empty() {
            Some(MatchType::Specific)
        } else if self.range.is_some() {
            Some(MatchType::Range)
        } else {
            None
        }
    }

    /// True when any specific chainage matches, or the range overlaps, the location.
    pub fn matches(&self, location: &Location) -> bool {
        self.specific
            .iter()
            .any(|point| Location::Point(*point).matches(location))
            || self
                .range
                .map(|range| Location::Range(range).matches(location))
                .unwrap_or(false)
    }

    /// Same as [`ChainageScope::matches`] on raw location text; unparseable text never matches.
    pub fn matches_raw(&self, location: &str) -> bool {
        parse_location(location)
            .map(|loc| self.matches(&loc))
            .unwrap_or(false)
    }
}

/// Anything carrying a location string that can be suggested.
pub trait Located {
    fn location_text(&self) -> &str;
    fn sort_key(&self) -> &str;
}

/// Union of every candidate whose location matches the scope, ordered by
/// location start then `sort_key`.
pub fn select_matching<'a, T: Located>(scope: &ChainageScope, candidates: &'a [T]) -> Vec<&'a T> {
    let mut hits: Vec<(u64, &T)> = candidates
        .iter()
        .filter_map(|c| {
            let location = parse_location(c.location_text()).ok()?;
            scope.matches(&location).then(|| (location.start(), c))
        })
        .collect();

    hits.sort_by(|(a_start, a), (b_start, b)| {
        a_start
            .cmp(b_start)
            .then_with(|| a.sort_key().cmp(b.sort_key()))
    });
    hits.into_iter().map(|(_, c)| c).collect()
}
