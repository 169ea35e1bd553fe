//! Package model and discovery
//!
//! This module provides the package family index, the package and variant
//! model, metadata loading, and wildcard expansion of requirements.

mod expand;
mod family;
mod index;
mod lazy;
mod metadata;
mod name;
#[allow(clippy::module_inception)]
mod package;
mod variant;

pub use expand::{expand_range, expand_requirement};
pub use family::{CombinedFamily, DirectoryFamily, FamilyPackages, PackageFamily};
pub use index::{
    FamilyIter, PackageIndex, PackageIter, SearchPath, first_family, iter_families, iter_packages,
};
pub use lazy::SetOnce;
pub use metadata::{
    FamilyDocument, METAFILE_EXTENSIONS, METAFILE_STEM, Metadata, STRIPPED_KEYS, find_metafile,
    load_document, load_metadata,
};
pub use name::{Requirement, is_valid_name, short_name, split_name, validate_name};
pub use package::{Package, RELEASE_TIME_FILE, ResolvedPackage};
pub(crate) use package::variant_requires;
pub use variant::Variant;
