use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::{Version, VersionError, is_separator, is_token_char};

/// A cut on the version line.
#[derive(Debug, Clone)]
enum Edge {
    NegInf,
    /// Just before the version.
    Below(Version),
    /// Just after the version.
    Above(Version),
    /// After the version and every version it prefixes.
    AboveFamily(Version),
    PosInf,
}

fn in_family(v: &Version, family: &Version) -> bool {
    v.starts_with(family)
}

fn cmp_edges(a: &Edge, b: &Edge) -> Ordering {
    use Edge::*;
    match (a, b) {
        (NegInf, NegInf) | (PosInf, PosInf) => Ordering::Equal,
        (NegInf, _) | (_, PosInf) => Ordering::Less,
        (_, NegInf) | (PosInf, _) => Ordering::Greater,

        (Below(x), Below(y)) | (Above(x), Above(y)) => x.cmp(y),
        (Below(x), Above(y)) => {
            if x <= y {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (Above(_), Below(_)) => cmp_edges(b, a).reverse(),

        (AboveFamily(x), AboveFamily(y)) => {
            if x == y {
                Ordering::Equal
            } else if in_family(x, y) {
                Ordering::Less
            } else if in_family(y, x) {
                Ordering::Greater
            } else {
                x.cmp(y)
            }
        }
        (Below(x), AboveFamily(y)) | (Above(x), AboveFamily(y)) => {
            if x < y || in_family(x, y) {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (AboveFamily(_), _) => cmp_edges(b, a).reverse(),
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        cmp_edges(self, other) == Ordering::Equal
    }
}

impl Eq for Edge {}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_edges(self, other)
    }
}

impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Bound {
    lower: Edge,
    upper: Edge,
}

impl Bound {
    fn any() -> Self {
        Self {
            lower: Edge::NegInf,
            upper: Edge::PosInf,
        }
    }

    fn contains(&self, v: &Version) -> bool {
        let above_lower = match &self.lower {
            Edge::NegInf => true,
            Edge::Below(a) => a <= v,
            Edge::Above(a) => a < v,
            Edge::AboveFamily(_) | Edge::PosInf => false,
        };
        let below_upper = match &self.upper {
            Edge::PosInf => true,
            Edge::Below(b) => v < b,
            Edge::Above(b) => v <= b,
            Edge::AboveFamily(b) => v <= b || in_family(v, b),
            Edge::NegInf => false,
        };
        above_lower && below_upper
    }

    /// A family upper edge can only be written together with its own lower edge.
    fn is_expressible(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Edge::Below(a), Edge::AboveFamily(b)) => a == b,
            (_, Edge::AboveFamily(_)) => false,
            _ => true,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Edge::*;
        match (&self.lower, &self.upper) {
            (NegInf, PosInf) => Ok(()),
            (Below(a), Above(b)) if a == b => write!(f, "=={}", a),
            (Below(a), AboveFamily(_)) => write!(f, "{}", a),
            (Below(a), PosInf) => write!(f, "{}+", a),
            (Above(a), PosInf) => write!(f, ">{}", a),
            (NegInf, Below(b)) => write!(f, "<{}", b),
            (NegInf, Above(b)) => write!(f, "<={}", b),
            (Below(a), Below(b)) => write!(f, "{}+<{}", a, b),
            (Below(a), Above(b)) => write!(f, "{}..{}", a, b),
            (Above(a), Below(b)) => write!(f, ">{}<{}", a, b),
            (Above(a), Above(b)) => write!(f, ">{}<={}", a, b),
            // Not produced by parsing or normalization
            (lower, upper) => write!(f, "{:?}..{:?}", lower, upper),
        }
    }
}

/// A union of version bounds, normalized on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    bounds: Vec<Bound>,
}

impl VersionRange {
    /// The range matching every version, written as the empty string.
    pub fn any() -> Self {
        Self {
            bounds: vec![Bound::any()],
        }
    }

    /// The range matching exactly one version.
    pub fn exact(version: &Version) -> Self {
        Self {
            bounds: vec![Bound {
                lower: Edge::Below(version.clone()),
                upper: Edge::Above(version.clone()),
            }],
        }
    }

    /// The family range of `version`: the version and every version it prefixes.
    pub fn family(version: &Version) -> Self {
        if version.is_empty() {
            return Self::any();
        }
        Self {
            bounds: vec![Bound {
                lower: Edge::Below(version.clone()),
                upper: Edge::AboveFamily(version.clone()),
            }],
        }
    }

    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::any());
        }

        let bounds = text
            .split('|')
            .map(|part| parse_bound(text, part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::normalized(bounds))
    }

    fn normalized(mut bounds: Vec<Bound>) -> Self {
        bounds.sort();
        let mut merged: Vec<Bound> = Vec::with_capacity(bounds.len());
        for bound in bounds {
            if let Some(last) = merged.last_mut()
                && bound.lower <= last.upper
            {
                let candidate = Bound {
                    lower: last.lower.clone(),
                    upper: last.upper.clone().max(bound.upper.clone()),
                };
                if candidate.is_expressible() {
                    *last = candidate;
                    continue;
                }
            }
            merged.push(bound);
        }
        Self { bounds: merged }
    }

    pub fn is_any(&self) -> bool {
        self.bounds.len() == 1 && self.bounds[0] == Bound::any()
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.bounds.iter().any(|b| b.contains(version))
    }

    /// Union of two ranges.
    pub fn union(&self, other: &VersionRange) -> VersionRange {
        let bounds = self.bounds.iter().chain(&other.bounds).cloned().collect();
        Self::normalized(bounds)
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, bound) in self.bounds.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{}", bound)?;
        }
        Ok(())
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

/// Split a leading version off `s`. Separators only count when a token follows.
fn take_version(s: &str) -> (&str, &str) {
    let bytes = s.as_bytes();
    let mut end = 0;
    while end < bytes.len() {
        let c = bytes[end] as char;
        if is_token_char(c) {
            end += 1;
        } else if is_separator(c)
            && end > 0
            && bytes
                .get(end + 1)
                .is_some_and(|&next| is_token_char(next as char))
        {
            end += 1;
        } else {
            break;
        }
    }
    s.split_at(end)
}

fn parse_bound(range: &str, part: &str) -> Result<Bound, VersionError> {
    let error = |reason: &str| VersionError::InvalidRange {
        range: range.to_string(),
        reason: reason.to_string(),
    };
    let version = |text: &str| -> Result<Version, VersionError> {
        if text.is_empty() {
            return Err(error("missing version"));
        }
        Version::parse(text).map_err(|_| error(&format!("invalid version '{}'", text)))
    };
    let upper = |rest: &str| -> Result<Edge, VersionError> {
        if let Some(text) = rest.strip_prefix("<=") {
            Ok(Edge::Above(version(text)?))
        } else if let Some(text) = rest.strip_prefix('<') {
            Ok(Edge::Below(version(text)?))
        } else if rest.is_empty() {
            Ok(Edge::PosInf)
        } else {
            Err(error(&format!("unexpected '{}'", rest)))
        }
    };

    let part = part.trim();
    let bound = if part.is_empty() {
        return Err(error("empty bound"));
    } else if let Some(text) = part.strip_prefix("==") {
        let v = version(text)?;
        Bound {
            lower: Edge::Below(v.clone()),
            upper: Edge::Above(v),
        }
    } else if part.starts_with('>') {
        let (inclusive, text) = match part.strip_prefix(">=") {
            Some(text) => (true, text),
            None => (false, &part[1..]),
        };
        let (text, rest) = take_version(text);
        let v = version(text)?;
        Bound {
            lower: if inclusive { Edge::Below(v) } else { Edge::Above(v) },
            upper: upper(rest)?,
        }
    } else if part.starts_with('<') {
        let upper = upper(part)?;
        Bound {
            lower: Edge::NegInf,
            upper,
        }
    } else {
        let (text, rest) = take_version(part);
        let v = version(text)?;
        if rest.is_empty() {
            Bound {
                lower: Edge::Below(v.clone()),
                upper: Edge::AboveFamily(v),
            }
        } else if let Some(rest) = rest.strip_prefix('+') {
            Bound {
                lower: Edge::Below(v),
                upper: upper(rest)?,
            }
        } else if let Some(text) = rest.strip_prefix("..") {
            Bound {
                lower: Edge::Below(v),
                upper: Edge::Above(version(text)?),
            }
        } else {
            return Err(error(&format!("unexpected '{}'", rest)));
        }
    };

    if bound.lower >= bound.upper {
        return Err(error("lower bound is not below upper bound"));
    }
    Ok(bound)
}
