use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use super::{KeyPart, SortKey, to_strings};
use crate::version::Version;

/// Version order, newest preferred unless `descending` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortedOrder {
    pub packages: Vec<String>,
    pub descending: bool,
}

impl SortedOrder {
    pub fn new<I, S>(packages: I, descending: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: to_strings(packages),
            descending,
        }
    }

    pub fn sort_key(&self, version: &Version) -> SortKey {
        if self.descending {
            SortKey::natural(version)
        } else {
            SortKey(vec![KeyPart::Descending(Reverse(version.clone()))])
        }
    }
}

/// Natural version order for the named families, opting them out of any
/// surrounding default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullPackageOrder {
    pub packages: Vec<String>,
}

impl NullPackageOrder {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: to_strings(packages),
        }
    }

    pub fn sort_key(&self, version: &Version) -> SortKey {
        SortKey::natural(version)
    }
}
