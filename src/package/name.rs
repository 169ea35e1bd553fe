//! Family names, short names and requirement strings.

use anyhow::Result;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::PackageError;
use crate::version::{Version, VersionRange};

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid name regex"));

pub fn is_valid_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

pub fn validate_name(name: &str) -> Result<()> {
    if !is_valid_name(name) {
        return Err(PackageError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

/// `name` for unversioned packages, `name-version` otherwise.
pub fn short_name(name: &str, version: &Version) -> String {
    if version.is_empty() {
        name.to_string()
    } else {
        format!("{}-{}", name, version)
    }
}

/// Split a short name such as `python-2.7.0` into its name and version.
pub fn split_name(short_name: &str) -> Result<(String, Version)> {
    let mut parts = short_name.split('-');
    let name = parts.next().unwrap_or_default();
    let version = parts.next().unwrap_or_default();
    if parts.next().is_some() {
        return Err(PackageError::InvalidPackageString(short_name.to_string()).into());
    }
    validate_name(name)?;
    Ok((name.to_string(), Version::parse(version)?))
}

/// A package request: a family name and the raw range text that follows it.
///
/// Accepted forms are `name`, `name-<range>` and `name<op><range>` where the
/// operator starts with `=`, `<` or `>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub range: String,
}

impl Requirement {
    pub fn parse(request: &str) -> Result<Self> {
        let request = request.trim();
        let split = request
            .find(|c: char| c == '-' || c == '=' || c == '<' || c == '>')
            .unwrap_or(request.len());
        let (name, rest) = request.split_at(split);
        if !is_valid_name(name) {
            return Err(PackageError::InvalidPackageString(request.to_string()).into());
        }
        let range = rest.strip_prefix('-').unwrap_or(rest);
        Ok(Self {
            name: name.to_string(),
            range: range.to_string(),
        })
    }

    pub fn version_range(&self) -> Result<VersionRange> {
        Ok(VersionRange::parse(&self.range)?)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.range.is_empty() {
            f.write_str(&self.name)
        } else if self.range.starts_with(['=', '<', '>']) {
            write!(f, "{}{}", self.name, self.range)
        } else {
            write!(f, "{}-{}", self.name, self.range)
        }
    }
}

impl FromStr for Requirement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Requirement::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("python").is_ok());
        assert!(validate_name("py_foo2").is_ok());

        for name in ["", "2python", "_python", "py-thon", "py.thon"] {
            let err = validate_name(name).unwrap_err();
            assert!(
                matches!(err.downcast_ref::<PackageError>(), Some(PackageError::InvalidName(_))),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("nada", &Version::empty()), "nada");
        assert_eq!(
            short_name("python", &Version::parse("2.7.0").unwrap()),
            "python-2.7.0"
        );
    }

    #[test]
    fn test_split_name() {
        let (name, version) = split_name("python-2.7.0").unwrap();
        assert_eq!(name, "python");
        assert_eq!(version.to_string(), "2.7.0");

        let (name, version) = split_name("nada").unwrap();
        assert_eq!(name, "nada");
        assert!(version.is_empty());
    }

    #[test]
    fn test_split_name_too_many_separators() {
        let err = split_name("python-2.7-0").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::InvalidPackageString(s)) if s == "python-2.7-0"
        ));
    }

    #[test]
    fn test_requirement_forms() {
        let req = Requirement::parse("python").unwrap();
        assert_eq!(req.name, "python");
        assert_eq!(req.range, "");
        assert_eq!(req.to_string(), "python");

        let req = Requirement::parse("python-2.6+<2.7").unwrap();
        assert_eq!(req.range, "2.6+<2.7");
        assert_eq!(req.to_string(), "python-2.6+<2.7");

        let req = Requirement::parse("pysplit==7").unwrap();
        assert_eq!(req.name, "pysplit");
        assert_eq!(req.range, "==7");
        assert_eq!(req.to_string(), "pysplit==7");

        let req: Requirement = "python<3".parse().unwrap();
        assert_eq!(req.range, "<3");
        assert!(req.version_range().unwrap().contains(&Version::parse("2.7").unwrap()));
    }

    #[test]
    fn test_requirement_invalid() {
        assert!(Requirement::parse("-2.7").is_err());
        assert!(Requirement::parse("2py-1").is_err());
    }
}
