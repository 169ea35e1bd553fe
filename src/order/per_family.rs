use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{PackageOrder, ReleaseHistory, SortKey};
use crate::error::PackageError;
use crate::version::Version;

/// Dispatch to the orderer governing each family, falling back to
/// `default_order` and then to natural order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PerFamilyPod", into = "PerFamilyPod")]
pub struct PerFamilyOrder {
    orderers: Vec<PackageOrder>,
    default_order: Option<Box<PackageOrder>>,
    by_family: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct PerFamilyPod {
    orderers: Vec<PackageOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_order: Option<Box<PackageOrder>>,
}

impl From<PerFamilyPod> for PerFamilyOrder {
    fn from(pod: PerFamilyPod) -> Self {
        Self::build(pod.orderers, pod.default_order.map(|o| *o))
    }
}

impl From<PerFamilyOrder> for PerFamilyPod {
    fn from(order: PerFamilyOrder) -> Self {
        Self {
            orderers: order.orderers,
            default_order: order.default_order,
        }
    }
}

impl PerFamilyOrder {
    /// Fails when two orderers claim the same family.
    pub fn new(orderers: Vec<PackageOrder>, default_order: Option<PackageOrder>) -> Result<Self> {
        let order = Self::build(orderers, default_order);
        order.validate()?;
        Ok(order)
    }

    // First claim wins; `validate` reports the rest
    fn build(orderers: Vec<PackageOrder>, default_order: Option<PackageOrder>) -> Self {
        let mut by_family = HashMap::new();
        for (i, orderer) in orderers.iter().enumerate() {
            for family in orderer.packages() {
                by_family.entry(family).or_insert(i);
            }
        }
        Self {
            orderers,
            default_order: default_order.map(Box::new),
            by_family,
        }
    }

    pub fn orderers(&self) -> &[PackageOrder] {
        &self.orderers
    }

    pub fn default_order(&self) -> Option<&PackageOrder> {
        self.default_order.as_deref()
    }

    pub fn packages(&self) -> Vec<String> {
        self.orderers.iter().flat_map(PackageOrder::packages).collect()
    }

    pub fn get(&self, family: &str) -> Option<&PackageOrder> {
        self.by_family.get(family).map(|&i| &self.orderers[i])
    }

    pub fn sort_key(&self, name: &str, version: &Version, history: &dyn ReleaseHistory) -> SortKey {
        match self.get(name).or(self.default_order()) {
            Some(orderer) => orderer.sort_key(name, version, history),
            None => SortKey::natural(version),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for family in self.packages() {
            if !seen.insert(family.clone()) {
                return Err(PackageError::DuplicateOrderer(family).into());
            }
        }
        for orderer in self.orderers.iter().chain(self.default_order()) {
            orderer.validate()?;
        }
        Ok(())
    }
}
