use std::path::PathBuf;

use super::package::Package;

/// One installable flavor of a package, selected by its co-package requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub package: Package,
    /// Position in the package's `variants` list, `None` for a package without variants.
    pub index: Option<usize>,
    pub requires: Vec<String>,
}

impl Variant {
    pub fn new(package: Package, index: Option<usize>, requires: Vec<String>) -> Self {
        Self {
            package,
            index,
            requires,
        }
    }

    /// The requirements joined as path components, relative to the package base.
    pub fn subpath(&self) -> PathBuf {
        self.requires.iter().collect()
    }

    pub fn root(&self) -> PathBuf {
        self.package.base.join(self.subpath())
    }

    /// `name-version[index]`, or the short name for the index-less variant.
    pub fn qualified_name(&self) -> String {
        match self.index {
            Some(index) => format!("{}[{}]", self.package.short_name(), index),
            None => self.package.short_name(),
        }
    }
}
