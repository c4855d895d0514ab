//! Year and decade filtering
//!
//! Files are bucketed by the decade of their recording/publication year:
//! `before1869s`, `1870s` .. `1990s`, `after2000s`, and `unknown` for files
//! whose year is missing or does not start with four digits.

use crate::token::FileMetadata;
use rustc_hash::FxHashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const FIRST_DECADE: i32 = 1870;
const LAST_DECADE: i32 = 1990;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Decade {
    Before1870,
    /// A decade between 1870 and 1990, by its first year
    Span(u16),
    After2000,
    Unknown,
}

impl Decade {
    /// Bucket for a numeric year
    pub fn of_year(year: i32) -> Decade {
        if year < FIRST_DECADE {
            Decade::Before1870
        } else if year >= LAST_DECADE + 10 {
            Decade::After2000
        } else {
            Decade::Span((year - year % 10) as u16)
        }
    }

    /// Every bucket in chronological order, `unknown` last
    pub fn all() -> impl Iterator<Item = Decade> {
        std::iter::once(Decade::Before1870)
            .chain((FIRST_DECADE..=LAST_DECADE).step_by(10).map(|y| Decade::Span(y as u16)))
            .chain([Decade::After2000, Decade::Unknown])
    }
}

impl fmt::Display for Decade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decade::Before1870 => write!(f, "before1869s"),
            Decade::Span(year) => write!(f, "{year}s"),
            Decade::After2000 => write!(f, "after2000s"),
            Decade::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown decade bucket: {0}")]
pub struct UnknownDecade(pub String);

impl FromStr for Decade {
    type Err = UnknownDecade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decade::all()
            .find(|decade| decade.to_string() == s.trim())
            .ok_or_else(|| UnknownDecade(s.to_string()))
    }
}

/// Leading four-digit year of a year string
pub fn parse_year(year: &str) -> Option<i32> {
    let bytes = year.trim().as_bytes();
    if bytes.len() < 4 || !bytes[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    atoi::atoi::<i32>(&bytes[..4])
}

/// Bucket for a year string
pub fn decade_key(year: &str) -> Decade {
    parse_year(year).map_or(Decade::Unknown, Decade::of_year)
}

/// Clean up a raw year value: empty and `nan` become absent, a leading
/// four-digit run is kept on its own, anything else is kept as written
pub fn normalize_year(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }
    match parse_year(trimmed) {
        Some(year) => Some(year.to_string()),
        None => Some(trimmed.to_string()),
    }
}

/// Inclusive year range that overrides the decade selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }
}

/// Selected decade buckets plus an optional custom range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearFilter {
    pub decades: FxHashSet<Decade>,
    pub custom_range: Option<YearRange>,
}

impl YearFilter {
    pub fn new(decades: impl IntoIterator<Item = Decade>) -> Self {
        Self {
            decades: decades.into_iter().collect(),
            custom_range: None,
        }
    }

    /// Filter that selects every bucket
    pub fn all() -> Self {
        Self::new(Decade::all())
    }

    pub fn with_custom_range(mut self, start: i32, end: i32) -> Self {
        self.custom_range = Some(YearRange { start, end });
        self
    }

    /// Whether a file with this metadata is selected
    pub fn passes(&self, metadata: Option<&FileMetadata>) -> bool {
        self.passes_year(metadata.and_then(|m| m.year.as_deref()))
    }

    pub fn passes_year(&self, year: Option<&str>) -> bool {
        let Some(year) = year.filter(|y| !y.trim().is_empty()) else {
            return self.decades.contains(&Decade::Unknown);
        };
        let Some(parsed) = parse_year(year) else {
            return self.decades.contains(&Decade::Unknown);
        };
        if self.custom_range.is_some_and(|range| range.contains(parsed)) {
            return true;
        }
        self.decades.contains(&Decade::of_year(parsed))
    }
}

impl Default for YearFilter {
    fn default() -> Self {
        Self::all()
    }
}
