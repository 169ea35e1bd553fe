use anyhow::Result;
use std::collections::HashMap;

use super::{PackageOrder, SortedOrder};
use crate::error::PackageError;

/// Family name that marks an orderer as the fallback for ungoverned families.
pub const DEFAULT_TOKEN: &str = "<DEFAULT>";

static NATURAL_ORDER: PackageOrder = PackageOrder::Sorted(SortedOrder {
    packages: Vec::new(),
    descending: true,
});

/// Configured orderers indexed by the families they govern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdererRegistry {
    orderers: Vec<PackageOrder>,
    by_family: HashMap<String, usize>,
}

impl OrdererRegistry {
    /// Fails when two orderers claim the same family.
    pub fn new(orderers: Vec<PackageOrder>) -> Result<Self> {
        let mut by_family = HashMap::new();
        for (i, orderer) in orderers.iter().enumerate() {
            orderer.validate()?;
            for family in orderer.packages() {
                if by_family.insert(family.clone(), i).is_some() {
                    return Err(PackageError::DuplicateOrderer(family).into());
                }
            }
        }
        Ok(Self {
            orderers,
            by_family,
        })
    }

    pub fn orderers(&self) -> &[PackageOrder] {
        &self.orderers
    }

    pub fn is_empty(&self) -> bool {
        self.orderers.is_empty()
    }

    pub fn get(&self, family: &str) -> Option<&PackageOrder> {
        self.by_family.get(family).map(|&i| &self.orderers[i])
    }
}

/// The orderer for `family`: its own, else the `<DEFAULT>` one, else natural order.
pub fn get_orderer<'a>(family: &str, registry: &'a OrdererRegistry) -> &'a PackageOrder {
    registry
        .get(family)
        .or_else(|| registry.get(DEFAULT_TOKEN))
        .unwrap_or(&NATURAL_ORDER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::ordered;
    use crate::order::{MemoryHistory, NullPackageOrder, PerFamilyOrder, VersionSplitPackageOrder};
    use crate::version::Version;

    fn registry() -> OrdererRegistry {
        OrdererRegistry::new(vec![
            NullPackageOrder::new(["pysplit"]).into(),
            VersionSplitPackageOrder::new(["python"], Version::parse("2.6.0").unwrap()).into(),
            SortedOrder::new([DEFAULT_TOKEN], false).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_get_orderer() {
        let registry = registry();
        assert_eq!(get_orderer("pysplit", &registry).type_name(), "no_order");
        assert_eq!(get_orderer("python", &registry).type_name(), "version_split");
        assert_eq!(
            get_orderer("pymum", &registry),
            &PackageOrder::Sorted(SortedOrder::new([DEFAULT_TOKEN], false))
        );
    }

    #[test]
    fn test_empty_registry_uses_natural_order() {
        let registry = OrdererRegistry::default();
        let history = MemoryHistory::new();
        assert!(registry.is_empty());
        assert_eq!(
            ordered(get_orderer("pymum", &registry), "pymum", &["1", "3", "2"], &history),
            vec!["3", "2", "1"]
        );
    }

    #[test]
    fn test_duplicate_family_is_rejected() {
        let err = OrdererRegistry::new(vec![
            NullPackageOrder::new(["python"]).into(),
            PerFamilyOrder::new(vec![SortedOrder::new(["python"], true).into()], None)
                .unwrap()
                .into(),
        ])
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::DuplicateOrderer(name)) if name == "python"
        ));
    }
}
