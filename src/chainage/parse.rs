use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

// K<km>+<m> with an optional side marker, e.g. "K23+066-RHS".
const POINT: &str = r"[Kk]?\s*(\d+)\s*\+\s*(\d+)(?:\s*-?\s*([LlRr][Hh][Ss]))?";

static POINT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"^\s*{POINT}\s*$")).unwrap());

static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^\s*{POINT}\s*(?:(?i:to)|-|~|–)\s*{POINT}\s*$"
    ))
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainageError {
    Empty,
    Malformed(String),
    IncompleteRange,
}

impl fmt::Display for ChainageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainageError::Empty => write!(f, "chainage is empty"),
            ChainageError::Malformed(raw) => {
                write!(f, "invalid chainage '{raw}', expected the form K23+066")
            }
            ChainageError::IncompleteRange => {
                write!(f, "a chainage range needs both a start and an end")
            }
        }
    }
}

impl std::error::Error for ChainageError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Lhs,
    Rhs,
}

impl Side {
    fn from_marker(marker: &str) -> Option<Self> {
        match marker.to_ascii_uppercase().as_str() {
            "LHS" => Some(Side::Lhs),
            "RHS" => Some(Side::Rhs),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Lhs => "LHS",
            Side::Rhs => "RHS",
        }
    }
}

/// A single position on the alignment. Comparisons ignore the side.
#[derive(Debug, Clone, Copy)]
pub struct Chainage {
    pub meters: u64,
    pub side: Option<Side>,
}

impl Chainage {
    pub fn new(meters: u64) -> Self {
        Self { meters, side: None }
    }
}

impl PartialEq for Chainage {
    fn eq(&self, other: &Self) -> bool {
        self.meters == other.meters
    }
}

impl Eq for Chainage {}

impl fmt::Display for Chainage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "K{}+{:03}", self.meters / 1000, self.meters % 1000)?;
        if let Some(side) = self.side {
            write!(f, "-{}", side.as_str())?;
        }
        Ok(())
    }
}

/// Inclusive `[start, end]` stretch of the alignment, always ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainageRange {
    pub start: u64,
    pub end: u64,
}

impl ChainageRange {
    pub fn new(a: u64, b: u64) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn contains(&self, meters: u64) -> bool {
        self.start <= meters && meters <= self.end
    }

    pub fn overlaps(&self, other: &ChainageRange) -> bool {
        self.start.max(other.start) <= self.end.min(other.end)
    }
}

impl fmt::Display for ChainageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            Chainage::new(self.start),
            Chainage::new(self.end)
        )
    }
}

/// Either shape a location field may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Point(Chainage),
    Range(ChainageRange),
}

impl Location {
    pub fn start(&self) -> u64 {
        match self {
            Location::Point(p) => p.meters,
            Location::Range(r) => r.start,
        }
    }

    pub fn matches(&self, other: &Location) -> bool {
        match (self, other) {
            (Location::Point(a), Location::Point(b)) => a.meters == b.meters,
            (Location::Point(p), Location::Range(r)) | (Location::Range(r), Location::Point(p)) => {
                r.contains(p.meters)
            }
            (Location::Range(a), Location::Range(b)) => a.overlaps(b),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Point(p) => fmt::Display::fmt(p, f),
            Location::Range(r) => fmt::Display::fmt(r, f),
        }
    }
}

fn point_from_captures(caps: &regex::Captures<'_>, offset: usize) -> Option<Chainage> {
    let km: u64 = caps.get(offset + 1)?.as_str().parse().ok()?;
    let m: u64 = caps.get(offset + 2)?.as_str().parse().ok()?;
    let side = caps
        .get(offset + 3)
        .and_then(|s| Side::from_marker(s.as_str()));
    Some(Chainage {
        meters: km.checked_mul(1000)?.checked_add(m)?,
        side,
    })
}

/// Parse a single chainage such as `K23+066` or `k23 + 066-RHS`.
pub fn parse_point(raw: &str) -> Result<Chainage, ChainageError> {
    if raw.trim().is_empty() {
        return Err(ChainageError::Empty);
    }
    POINT_RE
        .captures(raw)
        .and_then(|caps| point_from_captures(&caps, 0))
        .ok_or_else(|| ChainageError::Malformed(raw.trim().to_string()))
}

/// Meters for a single chainage.
pub fn parse(raw: &str) -> Result<u64, ChainageError> {
    parse_point(raw).map(|p| p.meters)
}

/// Parse a textual range (`K36+500 to K37+000`, `K36+500-K37+000`).
pub fn parse_range(raw: &str) -> Result<ChainageRange, ChainageError> {
    if raw.trim().is_empty() {
        return Err(ChainageError::Empty);
    }
    let caps = RANGE_RE
        .captures(raw)
        .ok_or_else(|| ChainageError::Malformed(raw.trim().to_string()))?;
    let a = point_from_captures(&caps, 0)
        .ok_or_else(|| ChainageError::Malformed(raw.trim().to_string()))?;
    let b = point_from_captures(&caps, 3)
        .ok_or_else(|| ChainageError::Malformed(raw.trim().to_string()))?;
    Ok(ChainageRange::new(a.meters, b.meters))
}

/// Build a range from separate start/end fields.
pub fn range_from_bounds(from: &str, to: &str) -> Result<ChainageRange, ChainageError> {
    match (from.trim().is_empty(), to.trim().is_empty()) {
        (true, true) => Err(ChainageError::Empty),
        (false, true) | (true, false) => Err(ChainageError::IncompleteRange),
        (false, false) => Ok(ChainageRange::new(parse(from)?, parse(to)?)),
    }
}

/// A location field: tries the range form first, then a single point.
pub fn parse_location(raw: &str) -> Result<Location, ChainageError> {
    if let Ok(range) = parse_range(raw) {
        return Ok(Location::Range(range));
    }
    parse_point(raw).map(Location::Point)
}

/// Items of a comma/semicolon separated list, trimmed, empties dropped.
pub(crate) fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// Comma/semicolon separated chainages; any malformed item fails the whole list.
pub fn parse_list(raw: &str) -> Result<Vec<Chainage>, ChainageError> {
    split_list(raw).map(parse_point).collect()
}

/// Like [`parse_list`] but skips malformed items.
pub fn parse_list_lenient(raw: &str) -> Vec<Chainage> {
    split_list(raw).filter_map(|item| parse_point(item).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kilometer_plus_meters() {
        assert_eq!(parse("K23+066"), Ok(23066));
        assert_eq!(parse("k0+005"), Ok(5));
        assert_eq!(parse("  K 23 + 066  "), Ok(23066));
    }

    #[test]
    fn side_suffix_is_ignored_for_value() {
        assert_eq!(parse("K23+066-RHS"), Ok(23066));
        assert_eq!(parse("K23+066 lhs"), Ok(23066));
        let point = parse_point("K23+066-RHS").unwrap();
        assert_eq!(point.side, Some(Side::Rhs));
        assert_eq!(point.to_string(), "K23+066-RHS");
        assert_eq!(point, Chainage::new(23066));
    }

    #[test]
    fn rejects_malformed_chainages() {
        assert_eq!(parse(""), Err(ChainageError::Empty));
        assert!(matches!(parse("K23"), Err(ChainageError::Malformed(_))));
        assert!(matches!(parse("23066"), Err(ChainageError::Malformed(_))));
        assert!(matches!(parse("K23+066-XYZ"), Err(ChainageError::Malformed(_))));
    }

    #[test]
    fn range_is_normalized_ascending() {
        assert_eq!(
            parse_range("K37+000 to K36+500"),
            Ok(ChainageRange { start: 36500, end: 37000 })
        );
        assert_eq!(
            parse_range("K36+500-K37+000"),
            Ok(ChainageRange { start: 36500, end: 37000 })
        );
        assert_eq!(
            parse_range("K36+500-RHS - K37+000-RHS"),
            Ok(ChainageRange { start: 36500, end: 37000 })
        );
        assert_eq!(
            parse_range("k36+500 TO k37+000"),
            Ok(ChainageRange { start: 36500, end: 37000 })
        );
    }

    #[test]
    fn range_from_bounds_requires_both_ends() {
        assert_eq!(
            range_from_bounds("K37+500", "K36+500"),
            Ok(ChainageRange::new(36500, 37500))
        );
        assert_eq!(
            range_from_bounds("K36+500", " "),
            Err(ChainageError::IncompleteRange)
        );
        assert_eq!(range_from_bounds("", ""), Err(ChainageError::Empty));
    }

    #[test]
    fn point_in_range_is_inclusive() {
        let range = ChainageRange::new(36500, 37000);
        assert!(range.contains(36750));
        assert!(range.contains(36500));
        assert!(range.contains(37000));
        assert!(!range.contains(35000));
    }

    #[test]
    fn ranges_overlap_when_max_start_is_within_min_end() {
        let a = ChainageRange::new(36000, 37000);
        assert!(a.overlaps(&ChainageRange::new(36500, 37500)));
        assert!(a.overlaps(&ChainageRange::new(37000, 37500)));
        assert!(!a.overlaps(&ChainageRange::new(38000, 39000)));
    }

    #[test]
    fn location_accepts_point_or_range() {
        assert_eq!(
            parse_location("K36+700"),
            Ok(Location::Point(Chainage::new(36700)))
        );
        assert_eq!(
            parse_location("K36+000 to K36+200"),
            Ok(Location::Range(ChainageRange::new(36000, 36200)))
        );
    }

    #[test]
    fn lists_split_on_commas_and_whitespace() {
        let points = parse_list("K35+897, K36+987 ;K40+000,").unwrap();
        let meters: Vec<_> = points.iter().map(|p| p.meters).collect();
        assert_eq!(meters, vec![35897, 36987, 40000]);
        assert!(parse_list("K35+897, nonsense").is_err());
        assert_eq!(parse_list_lenient("K35+897, nonsense").len(), 1);
    }
}
