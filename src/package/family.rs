//! Package families: every version of one named package.
//!
//! A family is either a directory holding one subdirectory per version, or a
//! single combined file describing all versions at once.

use anyhow::Result;
use log::debug;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::lazy::SetOnce;
use super::metadata::{FamilyDocument, Metadata, find_metafile, scalar_text};
use super::package::Package;
use crate::error::PackageError;
use crate::runtime::Runtime;
use crate::version::{Version, VersionRange};

#[derive(Debug, Clone)]
pub enum PackageFamily {
    Directory(DirectoryFamily),
    Combined(CombinedFamily),
}

impl PackageFamily {
    pub fn name(&self) -> &str {
        match self {
            PackageFamily::Directory(f) => &f.name,
            PackageFamily::Combined(f) => &f.name,
        }
    }

    /// The family directory, or the combined family file.
    pub fn location(&self) -> &Path {
        match self {
            PackageFamily::Directory(f) => &f.path,
            PackageFamily::Combined(f) => &f.path,
        }
    }

    /// Family-level metadata. Directory families have none.
    pub fn metadata<R: Runtime>(&self, runtime: &R) -> Result<Metadata> {
        match self {
            PackageFamily::Directory(_) => Ok(Metadata::new()),
            PackageFamily::Combined(f) => Ok(f.document(runtime)?.family.clone()),
        }
    }

    /// Every package in the family, in enumeration order (not sorted).
    pub fn iter_packages<'a, R: Runtime>(&self, runtime: &'a R) -> Result<FamilyPackages<'a, R>> {
        match self {
            PackageFamily::Directory(f) => f.iter_packages(runtime),
            PackageFamily::Combined(f) => f.iter_packages(runtime),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryFamily {
    pub name: String,
    pub path: PathBuf,
}

impl DirectoryFamily {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
        }
    }

    #[tracing::instrument(skip(self, runtime), fields(family = %self.name))]
    fn iter_packages<'a, R: Runtime>(&self, runtime: &'a R) -> Result<FamilyPackages<'a, R>> {
        let unversioned = find_metafile(runtime, &self.path);

        let mut entries = runtime.read_dir(&self.path)?;
        entries.sort();
        let candidates = entries
            .into_iter()
            .filter_map(|entry| {
                let file_name = entry.file_name()?.to_str()?.to_string();
                if file_name.starts_with('.') || !runtime.is_dir(&entry) {
                    return None;
                }
                match Version::parse(&file_name) {
                    Ok(version) if !version.is_empty() => Some((version, entry)),
                    _ => {
                        debug!("Skipping non-version entry {:?}", entry);
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        Ok(FamilyPackages {
            runtime,
            name: self.name.clone(),
            source: Source::Directory {
                unversioned,
                candidates: candidates.into_iter(),
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct CombinedFamily {
    pub name: String,
    pub path: PathBuf,
    document: SetOnce<FamilyDocument>,
}

impl CombinedFamily {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            document: SetOnce::new(),
        }
    }

    /// The parsed family file, loaded once per instance.
    pub fn document<R: Runtime>(&self, runtime: &R) -> Result<&FamilyDocument> {
        self.document
            .get_or_try_init(|| FamilyDocument::load(runtime, &self.path))
    }

    /// Versions named by the family's `versions` key.
    pub fn versions<R: Runtime>(&self, runtime: &R) -> Result<Vec<Version>> {
        let doc = self.document(runtime)?;
        let invalid = || PackageError::InvalidMetadata {
            path: self.path.clone(),
            reason: "'versions' must be a list of versions".to_string(),
        };

        match doc.family.get("versions") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    let text = scalar_text(item).ok_or_else(invalid)?;
                    Ok(Version::parse(&text)?)
                })
                .collect(),
            Some(_) => Err(invalid().into()),
        }
    }

    #[tracing::instrument(skip(self, runtime), fields(family = %self.name))]
    fn iter_packages<'a, R: Runtime>(&self, runtime: &'a R) -> Result<FamilyPackages<'a, R>> {
        let versions = self.versions(runtime)?;
        let document = self.document(runtime)?.clone();

        Ok(FamilyPackages {
            runtime,
            name: self.name.clone(),
            source: Source::Combined {
                path: self.path.clone(),
                unversioned: versions.is_empty(),
                document,
                versions: versions.into_iter(),
            },
        })
    }
}

/// Per-version data: the first overlay whose `version` range contains the
/// version, else the family data.
fn version_data(path: &Path, document: &FamilyDocument, version: &Version) -> Result<Metadata> {
    let mut data = document.family.clone();
    for overlay in &document.overlays {
        let Some(value) = overlay.get("version") else {
            continue;
        };
        let text = scalar_text(value).ok_or_else(|| PackageError::InvalidMetadata {
            path: path.to_path_buf(),
            reason: "overlay 'version' must be a string or an integer".to_string(),
        })?;
        let range = VersionRange::parse(&text).map_err(|e| PackageError::InvalidMetadata {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if range.contains(version) {
            data = overlay.clone();
            break;
        }
    }

    data.remove("versions");
    data.insert("version".to_string(), Value::String(version.to_string()));
    Ok(data)
}

enum Source {
    Directory {
        unversioned: Option<PathBuf>,
        candidates: std::vec::IntoIter<(Version, PathBuf)>,
    },
    Combined {
        path: PathBuf,
        unversioned: bool,
        document: FamilyDocument,
        versions: std::vec::IntoIter<Version>,
    },
}

/// Lazy sequence of the packages in one family.
pub struct FamilyPackages<'a, R: Runtime> {
    runtime: &'a R,
    name: String,
    source: Source,
}

impl<R: Runtime> std::fmt::Debug for FamilyPackages<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilyPackages")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<R: Runtime> Iterator for FamilyPackages<'_, R> {
    type Item = Result<Package>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            Source::Directory {
                unversioned,
                candidates,
            } => {
                if let Some(metafile) = unversioned.take() {
                    return Some(Package::new(&self.name, Version::empty(), metafile));
                }
                for (version, dir) in candidates.by_ref() {
                    match find_metafile(self.runtime, &dir) {
                        Some(metafile) => return Some(Package::new(&self.name, version, metafile)),
                        None => debug!("No package definition in {:?}", dir),
                    }
                }
                None
            }
            Source::Combined {
                path,
                unversioned,
                document,
                versions,
            } => {
                if std::mem::take(unversioned) {
                    let package = Package::new(&self.name, Version::empty(), path.clone())
                        .map(|p| p.with_metadata(document.family.clone()).with_timestamp(0));
                    return Some(package);
                }
                let version = versions.next()?;
                let package = version_data(path, document, &version).and_then(|data| {
                    Ok(Package::new(&self.name, version, path.clone())?
                        .with_metadata(data)
                        .with_timestamp(0))
                });
                Some(package)
            }
        }
    }
}
