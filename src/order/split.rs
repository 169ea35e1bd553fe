use serde::{Deserialize, Serialize};

use super::{KeyPart, SortKey, to_strings};
use crate::version::Version;

/// Prefer versions at or below `first_version`; natural order within each side.
///
/// The pivot need not be an existing version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSplitPackageOrder {
    pub packages: Vec<String>,
    pub first_version: Version,
}

impl VersionSplitPackageOrder {
    pub fn new<I, S>(packages: I, first_version: Version) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: to_strings(packages),
            first_version,
        }
    }

    pub fn sort_key(&self, version: &Version) -> SortKey {
        SortKey(vec![
            KeyPart::Flag(version <= &self.first_version),
            KeyPart::Ascending(version.clone()),
        ])
    }
}
