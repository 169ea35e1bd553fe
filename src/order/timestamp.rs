use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{KeyPart, ReleaseHistory, SortKey, to_strings};
use crate::version::Version;

/// Prefer versions released at or before `timestamp`, newest first, then the
/// later releases oldest first.
///
/// With a non-zero `rank`, later releases that only differ from the newest
/// eligible one below token `rank` (patch releases when `rank` is 3) still
/// count as eligible, and the remaining later releases are grouped by their
/// first `rank - 1` tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampPackageOrder {
    pub packages: Vec<String>,
    pub timestamp: u64,
    #[serde(default)]
    pub rank: usize,
    #[serde(skip)]
    cache: FirstAfterCache,
}

/// Per-family memo of the first version not preferred by timestamp.
#[derive(Debug, Default)]
struct FirstAfterCache(Mutex<HashMap<String, Option<Version>>>);

impl Clone for FirstAfterCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl PartialEq for FirstAfterCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl TimestampPackageOrder {
    pub fn new<I, S>(packages: I, timestamp: u64, rank: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: to_strings(packages),
            timestamp,
            rank,
            cache: FirstAfterCache::default(),
        }
    }

    pub fn sort_key(&self, name: &str, version: &Version, history: &dyn ReleaseHistory) -> SortKey {
        match self.first_after(name, history) {
            Some(first_after) if version >= &first_after => {
                if self.rank > 0 {
                    let n = self.rank - 1;
                    SortKey(vec![
                        KeyPart::Flag(false),
                        KeyPart::Descending(Reverse(version.trim(n))),
                        KeyPart::Ascending(version.tail(n)),
                    ])
                } else {
                    SortKey(vec![
                        KeyPart::Flag(false),
                        KeyPart::Descending(Reverse(version.clone())),
                    ])
                }
            }
            _ => SortKey(vec![KeyPart::Flag(true), KeyPart::Ascending(version.clone())]),
        }
    }

    fn first_after(&self, name: &str, history: &dyn ReleaseHistory) -> Option<Version> {
        if let Ok(cache) = self.cache.0.lock()
            && let Some(found) = cache.get(name)
        {
            return found.clone();
        }

        let found = self.compute_first_after(history.release_times(name));
        debug!(
            "First release of '{}' after {}: {:?}",
            name,
            self.timestamp,
            found.as_ref().map(ToString::to_string)
        );
        if let Ok(mut cache) = self.cache.0.lock() {
            cache.insert(name.to_string(), found.clone());
        }
        found
    }

    fn compute_first_after(&self, mut releases: Vec<(Version, u64)>) -> Option<Version> {
        releases.retain(|(_, timestamp)| *timestamp != 0);
        releases.sort_by(|a, b| b.0.cmp(&a.0));

        // Walk down from the newest release until one is old enough
        let mut first_after = None;
        let mut boundary = None;
        for (i, (version, timestamp)) in releases.iter().enumerate() {
            if *timestamp > self.timestamp {
                first_after = Some(version.clone());
            } else {
                boundary = Some(i);
                break;
            }
        }

        let (Some(boundary), true) = (boundary, self.rank > 0) else {
            return first_after;
        };

        // Walk back up past releases in the same rank group as the boundary
        let n = self.rank - 1;
        let group = releases[boundary].0.trim(n);
        releases[..boundary]
            .iter()
            .rev()
            .map(|(version, _)| version)
            .find(|version| version.trim(n) != group)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::{ordered, versions};
    use crate::order::{MemoryHistory, MockReleaseHistory, PackageOrder};

    const RELEASES: [(&str, u64); 8] = [
        ("1.0.5", 1000),
        ("1.0.6", 2000),
        ("1.1.0", 3000),
        ("1.1.1", 3001),
        ("1.2.0", 4000),
        ("2.0.0", 5000),
        ("2.1.0", 6000),
        ("2.1.5", 7000),
    ];

    fn history() -> MemoryHistory {
        let mut history = MemoryHistory::new();
        for (version, timestamp) in RELEASES {
            history.insert("timestamped", Version::parse(version).unwrap(), timestamp);
        }
        history
    }

    fn all_versions() -> Vec<&'static str> {
        RELEASES.iter().map(|(v, _)| *v).collect()
    }

    #[test]
    fn test_rank_groups_patch_releases() {
        let orderer: PackageOrder = TimestampPackageOrder::new(["timestamped"], 3001, 3).into();
        assert_eq!(
            ordered(&orderer, "timestamped", &all_versions(), &history()),
            vec!["1.1.1", "1.1.0", "1.0.6", "1.0.5", "1.2.0", "2.0.0", "2.1.5", "2.1.0"]
        );
    }

    #[test]
    fn test_rank_zero_orders_later_releases_oldest_first() {
        let orderer: PackageOrder = TimestampPackageOrder::new(["timestamped"], 3500, 0).into();
        assert_eq!(
            ordered(&orderer, "timestamped", &all_versions(), &history()),
            vec!["1.1.1", "1.1.0", "1.0.6", "1.0.5", "1.2.0", "2.0.0", "2.1.0", "2.1.5"]
        );
    }

    #[test]
    fn test_rank_pulls_in_same_group_releases() {
        // 1.1.1 is after the reference but shares 1.1 with 1.1.0
        let orderer: PackageOrder = TimestampPackageOrder::new(["timestamped"], 3000, 3).into();
        assert_eq!(
            ordered(&orderer, "timestamped", &all_versions(), &history())[..5],
            ["1.1.1", "1.1.0", "1.0.6", "1.0.5", "1.2.0"]
        );
    }

    #[test]
    fn test_everything_before_reference_is_natural() {
        let orderer: PackageOrder = TimestampPackageOrder::new(["timestamped"], 10_000, 3).into();
        assert_eq!(
            ordered(&orderer, "timestamped", &["1.0.5", "2.1.5", "1.2.0"], &history()),
            vec!["2.1.5", "1.2.0", "1.0.5"]
        );
    }

    #[test]
    fn test_untimestamped_releases_are_ignored() {
        let mut history = MemoryHistory::new();
        history.insert("pyfoo", Version::parse("1").unwrap(), 100);
        history.insert("pyfoo", Version::parse("2").unwrap(), 0);
        history.insert("pyfoo", Version::parse("3").unwrap(), 300);

        let orderer: PackageOrder = TimestampPackageOrder::new(["pyfoo"], 200, 0).into();
        // 2 is unknown, so it sorts with the releases before 3
        assert_eq!(ordered(&orderer, "pyfoo", &["1", "2", "3"], &history), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_first_after_is_memoized_per_family() {
        let mut history = MockReleaseHistory::new();
        history
            .expect_release_times()
            .withf(|family| family == "pyfoo")
            .times(1)
            .returning(|_| vec![(Version::parse("1").unwrap(), 100)]);

        let orderer = TimestampPackageOrder::new(["pyfoo"], 50, 0);
        for v in versions(&["1", "2", "3"]) {
            orderer.sort_key("pyfoo", &v, &history);
        }
    }

    #[test]
    fn test_clone_starts_with_empty_cache() {
        let orderer = TimestampPackageOrder::new(["timestamped"], 3001, 3);
        orderer.sort_key("timestamped", &Version::parse("1.0.5").unwrap(), &history());
        let copy = orderer.clone();
        assert_eq!(copy, orderer);
        assert!(copy.cache.0.lock().unwrap().is_empty());
    }
}
