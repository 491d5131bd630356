//! Maven-style version ranges.
//!
//! Supported forms:
//!
//! | Range              | Meaning                    |
//! |--------------------|----------------------------|
//! | `[1.0,2.0)`        | 1.0 <= v < 2.0             |
//! | `(1.0,2.0]`        | 1.0 < v <= 2.0             |
//! | `[1.5,)`           | v >= 1.5                   |
//! | `(,1.0]`           | v <= 1.0                   |
//! | `[1.2]`            | v == 1.2                   |
//! | `[1.0,2.0),[3.0,)` | union of the two intervals |
//!
//! Versions are compared as semantic versions after padding missing minor
//! and patch components with zero, so `1.2` is `1.2.0`.

use std::fmt;
use std::str::FromStr;

use semver::Version;

/// Parse a repository version leniently.
///
/// Returns `None` for snapshots and for anything that is not a dotted numeric
/// version with an optional `-qualifier`.
pub fn parse_version(raw: &str) -> Option<Version> {
  let raw = raw.trim();
  if raw.ends_with("-SNAPSHOT") {
    return None;
  }

  let (core, qualifier) = match raw.split_once('-') {
    Some((core, qualifier)) => (core, Some(qualifier)),
    None => (raw, None),
  };

  let mut parts: Vec<&str> = core.split('.').collect();
  if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
    return None;
  }
  while parts.len() < 3 {
    parts.push("0");
  }

  let mut normalized = parts.join(".");
  if let Some(qualifier) = qualifier {
    normalized.push('-');
    normalized.push_str(qualifier);
  }
  Version::parse(&normalized).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
  version: Version,
  inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Interval {
  lower: Option<Bound>,
  upper: Option<Bound>,
}

impl Interval {
  fn contains(&self, version: &Version) -> bool {
    let above = match &self.lower {
      Some(b) if b.inclusive => version >= &b.version,
      Some(b) => version > &b.version,
      None => true,
    };
    let below = match &self.upper {
      Some(b) if b.inclusive => version <= &b.version,
      Some(b) => version < &b.version,
      None => true,
    };
    above && below
  }
}

/// A union of version intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
  source: String,
  intervals: Vec<Interval>,
}

impl VersionRange {
  pub fn contains(&self, version: &Version) -> bool {
    self.intervals.iter().any(|interval| interval.contains(version))
  }

  /// Pick the highest of `candidates` inside the range.
  pub fn best_match<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    candidates
      .into_iter()
      .filter_map(|raw| parse_version(raw).map(|version| (version, raw)))
      .filter(|(version, _)| self.contains(version))
      .max_by(|a, b| a.0.cmp(&b.0))
      .map(|(_, raw)| raw)
  }
}

impl fmt::Display for VersionRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.source)
  }
}

/// Why a range expression was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeError(pub String);

impl fmt::Display for RangeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl std::error::Error for RangeError {}

fn bound(raw: &str, inclusive: bool) -> Result<Option<Bound>, RangeError> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Ok(None);
  }
  let version = parse_version(raw).ok_or_else(|| RangeError(format!("'{raw}' is not a version")))?;
  Ok(Some(Bound { version, inclusive }))
}

impl FromStr for VersionRange {
  type Err = RangeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut intervals = Vec::new();
    let mut rest = s.trim();

    while !rest.is_empty() {
      let lower_inclusive = match rest.chars().next() {
        Some('[') => true,
        Some('(') => false,
        _ => return Err(RangeError(format!("expected '[' or '(' at '{rest}'"))),
      };
      let end = rest
        .find(|c| c == ']' || c == ')')
        .ok_or_else(|| RangeError("unterminated interval".to_string()))?;
      let upper_inclusive = rest[end..].starts_with(']');
      let body = &rest[1..end];

      let interval = match body.split_once(',') {
        Some((lower, upper)) => Interval {
          lower: bound(lower, lower_inclusive)?,
          upper: bound(upper, upper_inclusive)?,
        },
        None => {
          if !(lower_inclusive && upper_inclusive) {
            return Err(RangeError(format!("single version '{body}' must use '[...]'")));
          }
          let exact = bound(body, true)?.ok_or_else(|| RangeError("empty interval".to_string()))?;
          Interval {
            lower: Some(exact.clone()),
            upper: Some(exact),
          }
        }
      };
      intervals.push(interval);

      rest = rest[end + 1..].trim_start();
      if let Some(next) = rest.strip_prefix(',') {
        rest = next.trim_start();
      }
    }

    if intervals.is_empty() {
      return Err(RangeError("empty range".to_string()));
    }

    Ok(Self {
      source: s.trim().to_string(),
      intervals,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(s: &str) -> Version {
    parse_version(s).unwrap()
  }

  fn range(s: &str) -> VersionRange {
    s.parse().unwrap()
  }

  #[test]
  fn lenient_version_parsing() {
    assert_eq!(v("1"), Version::new(1, 0, 0));
    assert_eq!(v("1.2"), Version::new(1, 2, 0));
    assert_eq!(v("1.2.3"), Version::new(1, 2, 3));
    assert!(v("1.2.3-RC1") < v("1.2.3"));
    assert_eq!(parse_version("1.1.1-SNAPSHOT"), None);
    assert_eq!(parse_version("latest"), None);
    assert_eq!(parse_version("1.2.3.4"), None);
  }

  #[test]
  fn half_open_interval() {
    let r = range("[1.0.0,2.0.0)");
    assert!(r.contains(&v("1.0.0")));
    assert!(r.contains(&v("1.9.9")));
    assert!(!r.contains(&v("2.0.0")));
    assert!(!r.contains(&v("0.9")));
  }

  #[test]
  fn open_ended_intervals() {
    assert!(range("[1.5,)").contains(&v("99.0")));
    assert!(!range("[1.5,)").contains(&v("1.4")));
    assert!(range("(,1.0]").contains(&v("1.0")));
    assert!(!range("(,1.0)").contains(&v("1.0")));
  }

  #[test]
  fn exact_interval() {
    let r = range("[1.2]");
    assert!(r.contains(&v("1.2.0")));
    assert!(!r.contains(&v("1.2.1")));
  }

  #[test]
  fn union_of_intervals() {
    let r = range("[1.0,2.0), [3.0,)");
    assert!(r.contains(&v("1.5")));
    assert!(!r.contains(&v("2.5")));
    assert!(r.contains(&v("3.1")));
  }

  #[test]
  fn best_match_picks_highest_in_range() {
    let versions = ["0.9.0", "1.0.0", "1.0.1", "1.10.0", "1.2.0", "2.0.0", "1.11.0-SNAPSHOT"];
    assert_eq!(range("[1.0.0,2.0.0)").best_match(versions), Some("1.10.0"));
    assert_eq!(range("[3.0,)").best_match(versions), None);
  }

  #[test]
  fn malformed_ranges_are_rejected() {
    assert!("1.0,2.0".parse::<VersionRange>().is_err());
    assert!("[1.0,2.0".parse::<VersionRange>().is_err());
    assert!("(1.0)".parse::<VersionRange>().is_err());
    assert!("[abc,)".parse::<VersionRange>().is_err());
  }
}
