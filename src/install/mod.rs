//! Installing package variants into a repository directory.
//!
//! Layout of an installed package:
//!
//! ```text
//! <repo>/<name>/<version>/package.json
//! <repo>/<name>/<version>/<variant subpath>/
//! ```
//!
//! Unversioned packages live directly in `<repo>/<name>/`.

mod staging;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::PackageError;
use crate::package::{
    METAFILE_EXTENSIONS, Metadata, Variant, find_metafile, load_metadata, variant_requires,
};
use crate::runtime::Runtime;
use staging::StagingDir;

/// Keys describing a release rather than the package itself.
pub const RELEASE_KEYS: [&str; 7] = [
    "timestamp",
    "revision",
    "changelog",
    "release_message",
    "previous_version",
    "previous_revision",
    "vcs",
];

const INSTALLED_METAFILE: &str = "package.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The package and variant were already installed with identical data.
    Unchanged,
    /// The variant was present but the package data was rewritten.
    Updated,
    /// The package or the variant was newly added.
    Installed,
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InstallOutcome::Unchanged => "unchanged",
            InstallOutcome::Updated => "updated",
            InstallOutcome::Installed => "installed",
        };
        f.write_str(text)
    }
}

/// What an install would do, decided before anything is written.
enum Plan {
    Unchanged,
    NewPackage { metadata: Metadata },
    AddVariant { metafile: PathBuf, metadata: Metadata },
    Update { metafile: PathBuf, metadata: Metadata },
}

impl Plan {
    fn outcome(&self) -> InstallOutcome {
        match self {
            Plan::Unchanged => InstallOutcome::Unchanged,
            Plan::Update { .. } => InstallOutcome::Updated,
            Plan::NewPackage { .. } | Plan::AddVariant { .. } => InstallOutcome::Installed,
        }
    }
}

pub struct VariantInstaller<'a, R: Runtime> {
    runtime: &'a R,
    repo: PathBuf,
}

impl<'a, R: Runtime> VariantInstaller<'a, R> {
    pub fn new(runtime: &'a R, repo: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            repo: repo.into(),
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// What [`install`](Self::install) would do, without touching the repository.
    /// `None` means the variant is installed and up to date.
    #[tracing::instrument(skip(self, variant), fields(variant = %variant.qualified_name()))]
    pub fn dry_run(&self, variant: &Variant) -> Result<Option<InstallOutcome>> {
        let outcome = self.plan(variant)?.outcome();
        Ok((outcome != InstallOutcome::Unchanged).then_some(outcome))
    }

    #[tracing::instrument(skip(self, variant), fields(variant = %variant.qualified_name()))]
    pub fn install(&self, variant: &Variant) -> Result<InstallOutcome> {
        let plan = self.plan(variant)?;
        let outcome = plan.outcome();
        let target = self.package_dir(variant);

        match plan {
            Plan::Unchanged => debug!("{} is up to date", variant.qualified_name()),
            Plan::NewPackage { metadata } => {
                if let Some(parent) = target.parent() {
                    self.runtime.create_dir_all(parent)?;
                }
                let staging = StagingDir::new(self.runtime, &target)?;
                let payload = staging.path().join(variant.subpath());
                if payload != staging.path() {
                    self.runtime.create_dir_all(&payload)?;
                }
                self.copy_payload(variant, &payload)?;
                self.write_metadata(&staging.path().join(INSTALLED_METAFILE), &metadata)?;
                staging.commit(&target)?;
            }
            Plan::AddVariant { metafile, metadata } => {
                let payload = target.join(variant.subpath());
                if payload == target {
                    self.rewrite_metadata(&metafile, &target, &metadata)?;
                } else {
                    self.publish_payload(variant, &payload)?;
                    // Unlisted payload would block every later install of this variant
                    if let Err(e) = self.rewrite_metadata(&metafile, &target, &metadata) {
                        if let Err(cleanup) = self.runtime.remove_dir_all(&payload) {
                            warn!("Failed to remove {:?}: {:#}", payload, cleanup);
                        }
                        return Err(e);
                    }
                }
            }
            Plan::Update { metafile, metadata } => {
                self.rewrite_metadata(&metafile, &target, &metadata)?;
            }
        }

        if outcome != InstallOutcome::Unchanged {
            info!("{} {} into {:?}", outcome, variant.qualified_name(), self.repo);
        }
        Ok(outcome)
    }

    /// `<repo>/<name>/<version>`, or `<repo>/<name>` when unversioned.
    fn package_dir(&self, variant: &Variant) -> PathBuf {
        let package = &variant.package;
        let family_dir = self.repo.join(&package.name);
        if package.version.is_empty() {
            family_dir
        } else {
            family_dir.join(package.version.to_string())
        }
    }

    fn plan(&self, variant: &Variant) -> Result<Plan> {
        let package = &variant.package;
        let conflict = |reason: String| PackageError::InstallConflict {
            package: variant.qualified_name(),
            reason,
        };

        for ext in METAFILE_EXTENSIONS {
            let combined = self.repo.join(format!("{}.{}", package.name, ext));
            if self.runtime.exists(&combined) {
                return Err(conflict(format!(
                    "family '{}' is defined by the combined file {:?}",
                    package.name, combined
                ))
                .into());
            }
        }

        let source = package.metadata(self.runtime)?;
        let mut metadata = source.clone();
        metadata.remove("base");

        let target = self.package_dir(variant);
        if !self.runtime.exists(&target) {
            set_variants(&mut metadata, variant.index.map(|_| vec![variant.requires.clone()]));
            return Ok(Plan::NewPackage { metadata });
        }

        if !self.runtime.is_dir(&target) {
            return Err(conflict(format!("{:?} is not a directory", target)).into());
        }
        let metafile = find_metafile(self.runtime, &target)
            .ok_or_else(|| conflict(format!("{:?} has no package definition", target)))?;
        let installed = load_metadata(self.runtime, &metafile)?;
        let mut variants = variant_requires(&metafile, &installed)?;

        if variant.index.is_some() == variants.is_empty() {
            return Err(conflict(format!(
                "variant layout does not match the installed package in {:?}",
                target
            ))
            .into());
        }

        let present = variant.index.is_none() || variants.contains(&variant.requires);
        if !present {
            let payload = target.join(variant.subpath());
            if payload != target && self.runtime.exists(&payload) {
                return Err(conflict(format!("{:?} already exists", payload)).into());
            }
            variants.push(variant.requires.clone());
            set_variants(&mut metadata, Some(variants));
            return Ok(Plan::AddVariant { metafile, metadata });
        }

        if comparable(&installed) == comparable(source) {
            return Ok(Plan::Unchanged);
        }
        set_variants(&mut metadata, variant.index.map(|_| variants));
        Ok(Plan::Update { metafile, metadata })
    }

    /// Assemble the variant payload next to `payload` and rename it into place.
    fn publish_payload(&self, variant: &Variant, payload: &Path) -> Result<()> {
        if let Some(parent) = payload.parent() {
            self.runtime.create_dir_all(parent)?;
        }
        let staging = StagingDir::new(self.runtime, payload)?;
        self.copy_payload(variant, staging.path())?;
        staging.commit(payload)
    }

    /// Copy the contents of the variant root into `dest`, which must exist.
    fn copy_payload(&self, variant: &Variant, dest: &Path) -> Result<()> {
        let source = variant.root();
        if !self.runtime.is_dir(&source) {
            debug!("No payload for {} in {:?}", variant.qualified_name(), source);
            return Ok(());
        }
        for entry in self.runtime.read_dir(&source)? {
            // The definition is written separately
            if entry == variant.package.metafile {
                continue;
            }
            if let Some(file_name) = entry.file_name() {
                copy_tree(self.runtime, &entry, &dest.join(file_name))?;
            }
        }
        Ok(())
    }

    /// Replace the package definition in `dir`, removing one in another format.
    fn rewrite_metadata(&self, current: &Path, dir: &Path, metadata: &Metadata) -> Result<()> {
        let metafile = dir.join(INSTALLED_METAFILE);
        self.write_metadata(&metafile, metadata)?;
        // package.json is found first, so a leftover only wastes space
        if current != metafile
            && let Err(e) = self.runtime.remove_file(current)
        {
            warn!("Failed to remove old definition {:?}: {:#}", current, e);
        }
        Ok(())
    }

    fn write_metadata(&self, path: &Path, metadata: &Metadata) -> Result<()> {
        let content = serde_json::to_string_pretty(metadata)
            .context("Failed to serialize package metadata")?;
        let tmp = path.with_extension("json.tmp");
        self.runtime.write(&tmp, content.as_bytes())?;
        if let Err(e) = self.runtime.rename(&tmp, path) {
            let _ = self.runtime.remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }
}

fn copy_tree<R: Runtime>(runtime: &R, from: &Path, to: &Path) -> Result<()> {
    if !runtime.is_dir(from) {
        runtime.copy(from, to)?;
        return Ok(());
    }
    runtime.create_dir_all(to)?;
    for entry in runtime.read_dir(from)? {
        if let Some(file_name) = entry.file_name() {
            copy_tree(runtime, &entry, &to.join(file_name))?;
        }
    }
    Ok(())
}

fn set_variants(metadata: &mut Metadata, variants: Option<Vec<Vec<String>>>) {
    match variants {
        Some(variants) => {
            let value = variants.into_iter().map(Value::from).collect();
            metadata.insert("variants".to_string(), Value::Array(value));
        }
        None => {
            metadata.remove("variants");
        }
    }
}

/// Metadata with the keys that may legitimately differ between a source
/// package and its installed copy removed.
fn comparable(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(key, _)| {
            !RELEASE_KEYS.contains(&key.as_str()) && key.as_str() != "variants" && key.as_str() != "base"
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
