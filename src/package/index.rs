//! Discovery of package families and packages across search-path roots.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::family::{CombinedFamily, DirectoryFamily, FamilyPackages, PackageFamily};
use super::metadata::{METAFILE_EXTENSIONS, is_metafile_extension, scalar_text};
use super::name::{is_valid_name, validate_name};
use super::package::Package;
use crate::order::ReleaseHistory;
use crate::runtime::Runtime;
use crate::settings::Settings;
use crate::version::{Version, VersionRange};

/// Ordered list of repository roots. Earlier roots take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath(Vec<PathBuf>);

impl SearchPath {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self(roots)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.0
    }
}

impl From<PathBuf> for SearchPath {
    fn from(root: PathBuf) -> Self {
        Self(vec![root])
    }
}

impl From<&Path> for SearchPath {
    fn from(root: &Path) -> Self {
        Self(vec![root.to_path_buf()])
    }
}

impl From<Vec<PathBuf>> for SearchPath {
    fn from(roots: Vec<PathBuf>) -> Self {
        Self(roots)
    }
}

impl From<&[PathBuf]> for SearchPath {
    fn from(roots: &[PathBuf]) -> Self {
        Self(roots.to_vec())
    }
}

/// Iterate over families, root by root.
///
/// With a name, only that family is probed in each root; without one, every
/// family in each root is listed in file name order. Missing roots are
/// skipped. A root that cannot be listed yields one error and traversal
/// continues with the next root.
pub fn iter_families<'a, R: Runtime>(
    runtime: &'a R,
    name: Option<&str>,
    search_path: &SearchPath,
) -> Result<FamilyIter<'a, R>> {
    if let Some(name) = name {
        validate_name(name)?;
    }
    Ok(FamilyIter {
        runtime,
        name: name.map(str::to_string),
        roots: search_path.0.clone().into_iter(),
        pending: Vec::new().into_iter(),
    })
}

/// The first family found on the search path.
pub fn first_family<R: Runtime>(
    runtime: &R,
    name: &str,
    search_path: &SearchPath,
) -> Result<Option<PackageFamily>> {
    iter_families(runtime, Some(name), search_path)?
        .next()
        .transpose()
}

/// Iterate over the packages of every matching family, unsorted.
///
/// With `skip_duplicates`, only the first package with a given short name is
/// yielded across all families and roots.
pub fn iter_packages<'a, R: Runtime>(
    runtime: &'a R,
    name: Option<&str>,
    search_path: &SearchPath,
    skip_duplicates: bool,
) -> Result<PackageIter<'a, R>> {
    Ok(PackageIter {
        runtime,
        families: iter_families(runtime, name, search_path)?,
        current: None,
        seen: skip_duplicates.then(HashSet::new),
    })
}

pub struct FamilyIter<'a, R: Runtime> {
    runtime: &'a R,
    name: Option<String>,
    roots: std::vec::IntoIter<PathBuf>,
    pending: std::vec::IntoIter<PackageFamily>,
}

impl<R: Runtime> FamilyIter<'_, R> {
    #[tracing::instrument(skip(self))]
    fn scan_root(&self, root: &Path) -> Result<Vec<PackageFamily>> {
        match &self.name {
            Some(name) => Ok(self.probe(root, name)),
            None => {
                let mut entries = self
                    .runtime
                    .read_dir(root)
                    .with_context(|| format!("Failed to list package root {:?}", root))?;
                entries.sort();
                Ok(entries
                    .iter()
                    .filter_map(|entry| self.family_at(entry))
                    .collect())
            }
        }
    }

    fn probe(&self, root: &Path, name: &str) -> Vec<PackageFamily> {
        let mut families = Vec::new();
        let dir = root.join(name);
        if self.runtime.is_dir(&dir) {
            families.push(PackageFamily::Directory(DirectoryFamily::new(name, dir)));
        }
        let combined = METAFILE_EXTENSIONS
            .iter()
            .map(|ext| root.join(format!("{}.{}", name, ext)))
            .find(|path| self.runtime.exists(path) && !self.runtime.is_dir(path));
        if let Some(path) = combined {
            families.push(PackageFamily::Combined(CombinedFamily::new(name, path)));
        }
        families
    }

    fn family_at(&self, entry: &Path) -> Option<PackageFamily> {
        let file_name = entry.file_name()?.to_str()?;
        if file_name.starts_with('.') {
            return None;
        }

        if self.runtime.is_dir(entry) {
            if is_valid_name(file_name) {
                return Some(PackageFamily::Directory(DirectoryFamily::new(file_name, entry)));
            }
        } else if let Some((stem, ext)) = file_name.rsplit_once('.')
            && is_metafile_extension(ext)
            && is_valid_name(stem)
        {
            return Some(PackageFamily::Combined(CombinedFamily::new(stem, entry)));
        }

        debug!("Skipping {:?}: not a package family", entry);
        None
    }
}

impl<R: Runtime> Iterator for FamilyIter<'_, R> {
    type Item = Result<PackageFamily>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(family) = self.pending.next() {
                return Some(Ok(family));
            }

            let root = self.roots.next()?;
            if !self.runtime.is_dir(&root) {
                debug!("Skipping missing package root {:?}", root);
                continue;
            }
            match self.scan_root(&root) {
                Ok(families) => self.pending = families.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

pub struct PackageIter<'a, R: Runtime> {
    runtime: &'a R,
    families: FamilyIter<'a, R>,
    current: Option<FamilyPackages<'a, R>>,
    seen: Option<HashSet<String>>,
}

impl<R: Runtime> Iterator for PackageIter<'_, R> {
    type Item = Result<Package>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(packages) = &mut self.current {
                match packages.next() {
                    Some(Ok(package)) => {
                        if let Some(seen) = &mut self.seen
                            && !seen.insert(package.short_name())
                        {
                            continue;
                        }
                        return Some(Ok(package));
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => self.current = None,
                }
            }

            let family = match self.families.next()? {
                Ok(family) => family,
                Err(e) => return Some(Err(e)),
            };
            match family.iter_packages(self.runtime) {
                Ok(packages) => self.current = Some(packages),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Package queries against a search path.
///
/// The search path defaults to the configured packages path and can be
/// overridden per index.
pub struct PackageIndex<'a, R: Runtime> {
    runtime: &'a R,
    settings: &'a Settings,
    search_path: SearchPath,
}

impl<'a, R: Runtime> PackageIndex<'a, R> {
    pub fn new(runtime: &'a R, settings: &'a Settings) -> Self {
        Self {
            runtime,
            settings,
            search_path: SearchPath::new(settings.packages_path.clone()),
        }
    }

    pub fn with_search_path(mut self, search_path: impl Into<SearchPath>) -> Self {
        self.search_path = search_path.into();
        self
    }

    pub fn runtime(&self) -> &'a R {
        self.runtime
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    pub fn families(&self, name: Option<&str>) -> Result<FamilyIter<'a, R>> {
        iter_families(self.runtime, name, &self.search_path)
    }

    pub fn first_family(&self, name: &str) -> Result<Option<PackageFamily>> {
        first_family(self.runtime, name, &self.search_path)
    }

    pub fn packages(&self, name: Option<&str>, skip_duplicates: bool) -> Result<PackageIter<'a, R>> {
        iter_packages(self.runtime, name, &self.search_path, skip_duplicates)
    }

    /// Distinct versions present for a family, ascending.
    pub fn versions(&self, name: &str) -> Result<Vec<Version>> {
        let mut versions = self
            .packages(Some(name), true)?
            .map(|p| p.map(|p| p.version))
            .collect::<Result<Vec<_>>>()?;
        versions.sort();
        versions.dedup();
        Ok(versions)
    }

    pub fn latest_in_range(&self, name: &str, range: &VersionRange) -> Result<Option<Version>> {
        Ok(self
            .versions(name)?
            .into_iter()
            .filter(|v| range.contains(v))
            .max())
    }

    /// Packages of a family within `range`, sorted by version.
    ///
    /// `latest` sorts newest first. A non-zero `timestamp_cutoff` drops packages
    /// released after it. When `range` is "any" and the family declares a
    /// `default_version`, packages inside the default range come first.
    #[tracing::instrument(skip(self))]
    pub fn packages_in_range(
        &self,
        name: &str,
        range: &VersionRange,
        latest: bool,
        timestamp_cutoff: u64,
    ) -> Result<Vec<Package>> {
        let mut packages = self.packages(Some(name), true)?.collect::<Result<Vec<_>>>()?;

        if timestamp_cutoff > 0 {
            packages.retain(|p| p.timestamp(self.runtime, self.settings) <= timestamp_cutoff);
        }

        packages.sort_by(|a, b| a.version.cmp(&b.version));
        if latest {
            packages.reverse();
        }

        if range.is_any()
            && let Some(default_range) = self.default_version(name)?
        {
            let (preferred, rest): (Vec<_>, Vec<_>) = packages
                .into_iter()
                .partition(|p| default_range.contains(&p.version));
            packages = preferred.into_iter().chain(rest).collect();
        }

        packages.retain(|p| range.contains(&p.version));
        Ok(packages)
    }

    pub fn package_in_range(
        &self,
        name: &str,
        range: &VersionRange,
        latest: bool,
        timestamp_cutoff: u64,
    ) -> Result<Option<Package>> {
        Ok(self
            .packages_in_range(name, range, latest, timestamp_cutoff)?
            .into_iter()
            .next())
    }

    fn default_version(&self, name: &str) -> Result<Option<VersionRange>> {
        let Some(family) = self.first_family(name)? else {
            return Ok(None);
        };
        let metadata = family.metadata(self.runtime)?;
        let Some(value) = metadata.get("default_version") else {
            return Ok(None);
        };
        let text = scalar_text(value).with_context(|| {
            format!("default_version of family '{}' must be a string or an integer", name)
        })?;
        let range = VersionRange::parse(&text)
            .with_context(|| format!("Invalid default_version for family '{}'", name))?;
        Ok(Some(range))
    }
}

impl<R: Runtime> ReleaseHistory for PackageIndex<'_, R> {
    fn release_times(&self, family: &str) -> Vec<(Version, u64)> {
        let packages = match self.packages(Some(family), true) {
            Ok(packages) => packages,
            Err(e) => {
                warn!("Cannot read release history of '{}': {:#}", family, e);
                return Vec::new();
            }
        };

        packages
            .filter_map(|p| match p {
                Ok(p) => {
                    let timestamp = p.timestamp(self.runtime, self.settings);
                    Some((p.version, timestamp))
                }
                Err(e) => {
                    warn!("Skipping package of '{}': {:#}", family, e);
                    None
                }
            })
            .collect()
    }
}
