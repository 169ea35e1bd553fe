//! Wildcard expansion of requirements.
//!
//! `*` stands for one version token and `**` for the rest of the latest
//! version. Both are resolved against the versions actually present:
//!
//! - `python-2.6.*` becomes `python-2.6.8` when 2.6.8 is the latest 2.6 release
//! - `python-*+<**` becomes `python-2+<2.7.0`
//!
//! Expansion is best-effort: an unknown family leaves the request as written.

use anyhow::Result;
use log::debug;

use super::index::PackageIndex;
use super::name::Requirement;
use crate::runtime::Runtime;
use crate::version::{Version, VersionError, VersionRange, is_separator, is_token_char};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece<'a> {
    Operator(&'a str),
    Version(&'a str),
}

/// A validated wildcard version: fixed prefix plus how much of the match to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Wildcard {
    prefix: Version,
    /// Number of tokens to keep; `None` keeps the whole latest version.
    rank: Option<usize>,
}

/// Expand the wildcards in a request such as `python-2.*` or `pysplit==**`.
pub fn expand_requirement<R: Runtime>(index: &PackageIndex<'_, R>, request: &str) -> Result<String> {
    if !request.contains('*') {
        return Ok(request.to_string());
    }

    let mut requirement = Requirement::parse(request)?;
    requirement.range = expand_range(index, &requirement.name, &requirement.range)?;
    Ok(requirement.to_string())
}

/// Expand the wildcards in the range text of family `name`.
#[tracing::instrument(skip(index))]
pub fn expand_range<R: Runtime>(
    index: &PackageIndex<'_, R>,
    name: &str,
    range: &str,
) -> Result<String> {
    if !range.contains('*') {
        return Ok(range.to_string());
    }

    let pieces = split_range(range)?;
    // Validate every wildcard before touching storage
    let wildcards = pieces
        .iter()
        .map(|piece| match piece {
            Piece::Version(text) if text.contains('*') => parse_wildcard(text).map(Some),
            _ => Ok(None),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let versions = index.versions(name)?;
    if versions.is_empty() {
        debug!("No packages for '{}', leaving '{}' unexpanded", name, range);
        return Ok(range.to_string());
    }

    let expanded: String = pieces
        .iter()
        .zip(&wildcards)
        .map(|(piece, wildcard)| match (piece, wildcard) {
            (_, Some(wildcard)) => resolve(wildcard, &versions).to_string(),
            (Piece::Operator(text), None) | (Piece::Version(text), None) => text.to_string(),
        })
        .collect();

    let normalized = VersionRange::parse(&expanded)?;
    debug!("Expanded '{}' to '{}'", range, normalized);
    Ok(normalized.to_string())
}

fn resolve(wildcard: &Wildcard, versions: &[Version]) -> Version {
    let latest = versions.iter().filter(|v| v.starts_with(&wildcard.prefix)).max();
    match (latest, wildcard.rank) {
        (Some(latest), Some(rank)) => latest.trim(rank),
        (Some(latest), None) => latest.clone(),
        (None, _) => wildcard.prefix.clone(),
    }
}

/// Split range text into operators (`|`, `+`, `<`, `>`, `=`, `..`) and versions.
fn split_range(range: &str) -> Result<Vec<Piece<'_>>, VersionError> {
    let bytes = range.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        let operator_len = match c {
            '|' | '+' | '<' | '>' | '=' => 1,
            '.' if bytes.get(i + 1) == Some(&b'.') => 2,
            c if is_token_char(c) || is_separator(c) || c == '*' => 0,
            _ => {
                return Err(VersionError::InvalidRange {
                    range: range.to_string(),
                    reason: format!("unexpected character '{}'", c),
                });
            }
        };

        if operator_len == 0 {
            i += 1;
            continue;
        }
        if start < i {
            pieces.push(Piece::Version(&range[start..i]));
        }
        pieces.push(Piece::Operator(&range[i..i + operator_len]));
        i += operator_len;
        start = i;
    }
    if start < bytes.len() {
        pieces.push(Piece::Version(&range[start..]));
    }
    Ok(pieces)
}

/// Wildcards may only trail a version: any number of `*`, or one `**`
/// that is not followed by `*`.
fn parse_wildcard(text: &str) -> Result<Wildcard, VersionError> {
    let invalid = || VersionError::InvalidWildcard(text.to_string());

    // Split into tokens, remembering where each one starts
    let mut tokens: Vec<(usize, &str)> = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if is_separator(c) {
            tokens.push((start, &text[start..i]));
            start = i + 1;
        }
    }
    tokens.push((start, &text[start..]));

    let mut wildcards = 0;
    let mut latest = false;
    while let Some(&(_, token)) = tokens.last() {
        match token {
            "*" => wildcards += 1,
            "**" if wildcards == 0 => latest = true,
            "**" => return Err(invalid()),
            _ => break,
        }
        tokens.pop();
        if latest {
            break;
        }
    }
    if wildcards == 0 && !latest {
        return Err(invalid());
    }

    // Text before the first popped token, without its trailing separator
    let prefix_text = match tokens.last() {
        Some(&(offset, token)) => &text[..offset + token.len()],
        None => "",
    };
    if prefix_text.contains('*') {
        return Err(invalid());
    }
    let prefix = Version::parse(prefix_text).map_err(|_| invalid())?;

    let rank = (!latest).then(|| prefix.len() + wildcards);
    Ok(Wildcard { prefix, rank })
}
