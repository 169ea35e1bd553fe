use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

use super::lazy::SetOnce;
use super::metadata::{self, Metadata, find_metafile, load_metadata, scalar_text};
use super::name::{short_name, validate_name};
use super::variant::Variant;
use crate::error::PackageError;
use crate::runtime::{Runtime, is_path_under};
use crate::settings::Settings;
use crate::version::Version;

/// Sidecar file holding a package's release time, relative to its base.
pub const RELEASE_TIME_FILE: &str = ".metadata/release_time.txt";

// Untimestamped packages are reported once per process
static WARNED_UNTIMESTAMPED: LazyLock<Mutex<HashSet<PathBuf>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// An unresolved package: one version of a family, addressed by its metafile.
///
/// Metadata and timestamp are loaded lazily and memoized. Serialized packages
/// never carry their metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: Version,
    pub base: PathBuf,
    pub metafile: PathBuf,
    #[serde(skip)]
    metadata: SetOnce<Metadata>,
    #[serde(default)]
    timestamp: SetOnce<u64>,
}

impl Package {
    pub fn new(name: &str, version: Version, metafile: impl Into<PathBuf>) -> Result<Self> {
        let metafile = metafile.into();
        let has_extension = metafile
            .extension()
            .is_some_and(|ext| !ext.is_empty());
        if !has_extension {
            return Err(PackageError::MissingExtension {
                name: name.to_string(),
                path: metafile,
            }
            .into());
        }

        let base = metafile.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self {
            name: name.to_string(),
            version,
            base,
            metafile,
            metadata: SetOnce::new(),
            timestamp: SetOnce::new(),
        })
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = SetOnce::with_value(metadata);
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = SetOnce::with_value(timestamp);
        self
    }

    /// Load the package found in a source directory, taking its name and
    /// version from the metadata itself.
    #[tracing::instrument(skip(runtime))]
    pub fn developer_package<R: Runtime>(runtime: &R, dir: &Path) -> Result<Self> {
        let metafile = find_metafile(runtime, dir)
            .with_context(|| format!("No package definition found in {:?}", dir))?;
        let metadata = load_metadata(runtime, &metafile)?;
        let invalid = |reason: &str| PackageError::InvalidMetadata {
            path: metafile.clone(),
            reason: reason.to_string(),
        };

        let name = metadata
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing 'name'"))?
            .to_string();
        validate_name(&name)?;

        let version = match metadata.get("version") {
            None | Some(Value::Null) => Version::empty(),
            Some(value) => {
                let text = scalar_text(value)
                    .ok_or_else(|| invalid("'version' must be a string or an integer"))?;
                Version::parse(&text)?
            }
        };

        debug!("Found developer package {} in {:?}", short_name(&name, &version), dir);
        Ok(Self::new(&name, version, metafile)?
            .with_metadata(metadata)
            .with_timestamp(0))
    }

    pub fn short_name(&self) -> String {
        short_name(&self.name, &self.version)
    }

    /// Full metadata, loaded on first access.
    ///
    /// A load failure is returned and not remembered; the next call retries.
    pub fn metadata<R: Runtime>(&self, runtime: &R) -> Result<&Metadata> {
        self.metadata
            .get_or_try_init(|| load_metadata(runtime, &self.metafile))
            .with_context(|| format!("Failed to load metadata for {}", self.short_name()))
    }

    /// The cache-eligible subset of the metadata.
    pub fn stripped_metadata<R: Runtime>(&self, runtime: &R) -> Result<Metadata> {
        Ok(metadata::stripped(self.metadata(runtime)?))
    }

    pub(crate) fn clear_metadata(&mut self) {
        self.metadata.clear();
    }

    /// A package is local when it lives under the local packages path.
    pub fn is_local(&self, settings: &Settings) -> bool {
        is_path_under(&self.base, &settings.local_packages_path)
    }

    /// Release time in epoch seconds, 0 when unknown or local.
    pub fn timestamp<R: Runtime>(&self, runtime: &R, settings: &Settings) -> u64 {
        if let Some(timestamp) = self.timestamp.get() {
            return *timestamp;
        }

        match self.read_timestamp(runtime, settings) {
            Ok(timestamp) => *self.timestamp.get_or_init(|| timestamp),
            Err(e) => {
                // Not memoized: fixing the sidecar takes effect on the next call
                warn!("Ignoring release time of {}: {:#}", self.short_name(), e);
                0
            }
        }
    }

    fn read_timestamp<R: Runtime>(&self, runtime: &R, settings: &Settings) -> Result<u64> {
        if self.is_local(settings) {
            return Ok(0);
        }

        let sidecar = self.base.join(RELEASE_TIME_FILE);
        if !runtime.exists(&sidecar) {
            if settings.warn_untimestamped {
                let first = WARNED_UNTIMESTAMPED
                    .lock()
                    .map(|mut warned| warned.insert(self.base.clone()))
                    .unwrap_or(true);
                if first {
                    warn!("{:?} is not timestamped", self.base);
                }
            }
            return Ok(0);
        }

        let content = runtime.read_to_string(&sidecar)?;
        content
            .trim()
            .parse()
            .with_context(|| format!("Invalid release time in {:?}", sidecar))
    }

    /// Variants of this package, in declaration order.
    pub fn iter_variants<R: Runtime>(
        &self,
        runtime: &R,
    ) -> Result<impl Iterator<Item = Variant> + '_> {
        let requires = variant_requires(&self.metafile, self.metadata(runtime)?)?;
        let variants: Box<dyn Iterator<Item = Variant> + '_> = if requires.is_empty() {
            Box::new(std::iter::once(Variant::new(self.clone(), None, Vec::new())))
        } else {
            Box::new(
                requires
                    .into_iter()
                    .enumerate()
                    .map(|(i, requires)| Variant::new(self.clone(), Some(i), requires)),
            )
        };
        Ok(variants)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version && self.metafile == other.metafile
    }
}

impl Eq for Package {}

/// Parse the `variants` key: a list of requirement lists.
pub(crate) fn variant_requires(path: &Path, metadata: &Metadata) -> Result<Vec<Vec<String>>> {
    let invalid = || PackageError::InvalidMetadata {
        path: path.to_path_buf(),
        reason: "'variants' must be a list of requirement lists".to_string(),
    };

    let entries = match metadata.get("variants") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(invalid().into()),
    };

    entries
        .iter()
        .map(|entry| {
            entry
                .as_array()
                .ok_or_else(invalid)?
                .iter()
                .map(|req| req.as_str().map(str::to_string).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()
                .map_err(Into::into)
        })
        .collect()
}

/// A package bound to a concrete root, with its raw commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    pub package: Package,
    pub root: PathBuf,
    pub commands: Option<Vec<String>>,
    pub raw_commands: Option<String>,
}

impl ResolvedPackage {
    pub fn new<R: Runtime>(runtime: &R, package: Package, root: impl Into<PathBuf>) -> Result<Self> {
        let (commands, raw_commands) = match package.metadata(runtime)?.get("commands") {
            None | Some(Value::Null) => (None, None),
            Some(Value::String(text)) => {
                let lines = text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                (Some(lines), Some(text.clone()))
            }
            Some(Value::Array(items)) => {
                let lines = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| PackageError::InvalidMetadata {
                        path: package.metafile.clone(),
                        reason: "'commands' must be text or a list of strings".to_string(),
                    })?;
                let raw = lines.join("\n");
                (Some(lines), Some(raw))
            }
            Some(_) => {
                return Err(PackageError::InvalidMetadata {
                    path: package.metafile.clone(),
                    reason: "'commands' must be text or a list of strings".to_string(),
                }
                .into());
            }
        };

        Ok(Self {
            package,
            root: root.into(),
            commands,
            raw_commands,
        })
    }

    pub fn from_variant<R: Runtime>(runtime: &R, variant: &Variant) -> Result<Self> {
        Self::new(runtime, variant.package.clone(), variant.root())
    }

    /// Drop commands and metadata before caching, keeping identity fields.
    pub fn strip(&mut self) {
        self.commands = None;
        self.raw_commands = None;
        self.package.clear_metadata();
    }
}
