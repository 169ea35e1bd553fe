//! Package ordering strategies.
//!
//! An orderer maps `(family, version)` to a [`SortKey`]. Larger keys are more
//! preferred, so sorting by key in reverse yields the resolution order.
//! Orderers never fail: any version gets a key.
//!
//! # Structure
//!
//! - `sorted` - Natural and reversed version order
//! - `split` - Prefer versions at or below a pivot
//! - `timestamp` - Prefer versions released before a reference time
//! - `per_family` - Dispatch to per-family orderers with a default
//! - `registry` - Family lookup across configured orderers
//! - `pod` - Portable serialization of orderers

mod per_family;
mod pod;
mod registry;
mod sorted;
mod split;
mod timestamp;

pub use per_family::PerFamilyOrder;
pub use pod::{from_pod, registry_from_pod, registry_to_pod, to_pod};
pub use registry::{DEFAULT_TOKEN, OrdererRegistry, get_orderer};
pub use sorted::{NullPackageOrder, SortedOrder};
pub use split::VersionSplitPackageOrder;
pub use timestamp::TimestampPackageOrder;

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

use crate::version::Version;

/// Type tags used in portable orderer documents.
pub const ORDERER_TYPES: [&str; 5] = [
    "no_order",
    "sorted",
    "version_split",
    "soft_timestamp",
    "per_family",
];

/// Release times of a family's versions, in epoch seconds (0 when unknown).
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseHistory {
    fn release_times(&self, family: &str) -> Vec<(Version, u64)>;
}

/// Release history for callers that already know release times.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    families: HashMap<String, Vec<(Version, u64)>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, family: &str, version: Version, timestamp: u64) {
        self.families
            .entry(family.to_string())
            .or_default()
            .push((version, timestamp));
    }
}

impl ReleaseHistory for MemoryHistory {
    fn release_times(&self, family: &str) -> Vec<(Version, u64)> {
        self.families.get(family).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPart {
    Flag(bool),
    Ascending(Version),
    Descending(Reverse<Version>),
}

/// A totally ordered preference key. Keys produced by one orderer for one
/// family always share the same shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey(pub Vec<KeyPart>);

impl SortKey {
    /// Natural version order: newer is preferred.
    pub fn natural(version: &Version) -> Self {
        SortKey(vec![KeyPart::Ascending(version.clone())])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PackageOrder {
    #[serde(rename = "no_order")]
    Null(NullPackageOrder),
    #[serde(rename = "sorted")]
    Sorted(SortedOrder),
    #[serde(rename = "version_split")]
    VersionSplit(VersionSplitPackageOrder),
    #[serde(rename = "soft_timestamp")]
    Timestamp(TimestampPackageOrder),
    #[serde(rename = "per_family")]
    PerFamily(PerFamilyOrder),
}

impl PackageOrder {
    /// Families this orderer governs.
    pub fn packages(&self) -> Vec<String> {
        match self {
            PackageOrder::Null(o) => o.packages.clone(),
            PackageOrder::Sorted(o) => o.packages.clone(),
            PackageOrder::VersionSplit(o) => o.packages.clone(),
            PackageOrder::Timestamp(o) => o.packages.clone(),
            PackageOrder::PerFamily(o) => o.packages(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PackageOrder::Null(_) => "no_order",
            PackageOrder::Sorted(_) => "sorted",
            PackageOrder::VersionSplit(_) => "version_split",
            PackageOrder::Timestamp(_) => "soft_timestamp",
            PackageOrder::PerFamily(_) => "per_family",
        }
    }

    pub fn sort_key(&self, name: &str, version: &Version, history: &dyn ReleaseHistory) -> SortKey {
        match self {
            PackageOrder::Null(o) => o.sort_key(version),
            PackageOrder::Sorted(o) => o.sort_key(version),
            PackageOrder::VersionSplit(o) => o.sort_key(version),
            PackageOrder::Timestamp(o) => o.sort_key(name, version, history),
            PackageOrder::PerFamily(o) => o.sort_key(name, version, history),
        }
    }

    /// Sort versions of a family, most preferred first.
    pub fn order_versions(
        &self,
        name: &str,
        mut versions: Vec<Version>,
        history: &dyn ReleaseHistory,
    ) -> Vec<Version> {
        versions.sort_by_cached_key(|v| Reverse(self.sort_key(name, v, history)));
        versions
    }

    /// Check invariants that deserialization cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            PackageOrder::PerFamily(o) => o.validate(),
            _ => Ok(()),
        }
    }
}

macro_rules! impl_from_orderer {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PackageOrder {
                fn from(orderer: $ty) -> Self {
                    PackageOrder::$variant(orderer)
                }
            }
        )*
    };
}

impl_from_orderer! {
    Null => NullPackageOrder,
    Sorted => SortedOrder,
    VersionSplit => VersionSplitPackageOrder,
    Timestamp => TimestampPackageOrder,
    PerFamily => PerFamilyOrder,
}

pub(crate) fn to_strings<I, S>(packages: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    packages.into_iter().map(Into::into).collect()
}
