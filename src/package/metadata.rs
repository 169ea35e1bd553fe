//! Package metadata documents.
//!
//! Metadata is a string-keyed mapping loaded from `.json`, `.yaml` or `.yml`
//! files. Only a handful of keys carry meaning here; everything else is
//! passed through untouched.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::PackageError;
use crate::runtime::Runtime;

pub type Metadata = serde_json::Map<String, Value>;

/// Supported metadata file extensions, in search order.
pub const METAFILE_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Base name of the metafile inside a package directory.
pub const METAFILE_STEM: &str = "package";

/// Keys kept by the stripped (cache-eligible) view of a package.
pub const STRIPPED_KEYS: [&str; 8] = [
    "name",
    "version",
    "config_version",
    "requires",
    "build_requires",
    "variants",
    "commands",
    "versions",
];

pub fn is_metafile_extension(ext: &str) -> bool {
    METAFILE_EXTENSIONS.contains(&ext)
}

/// Parse a metadata file into a generic document, choosing the format by extension.
#[tracing::instrument(skip(runtime))]
pub fn load_document<R: Runtime>(runtime: &R, path: &Path) -> Result<Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let content = runtime.read_to_string(path)?;
    let invalid = |reason: String| PackageError::InvalidMetadata {
        path: path.to_path_buf(),
        reason,
    };

    match ext {
        "json" => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()).into()),
        "yaml" | "yml" => {
            // An empty YAML document is an empty mapping, not null
            if content.trim().is_empty() {
                return Ok(Value::Object(Metadata::new()));
            }
            serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()).into())
        }
        other => Err(invalid(format!("unsupported metadata format '{}'", other)).into()),
    }
}

/// Load a single-package metadata file, which must hold a mapping.
pub fn load_metadata<R: Runtime>(runtime: &R, path: &Path) -> Result<Metadata> {
    match load_document(runtime, path)? {
        Value::Object(map) => Ok(map),
        _ => Err(PackageError::InvalidMetadata {
            path: path.to_path_buf(),
            reason: "expected a mapping".to_string(),
        }
        .into()),
    }
}

/// Find `package.<ext>` in a directory, trying extensions in order.
pub fn find_metafile<R: Runtime>(runtime: &R, dir: &Path) -> Option<PathBuf> {
    METAFILE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", METAFILE_STEM, ext)))
        .find(|path| runtime.exists(path) && !runtime.is_dir(path))
}

pub fn stripped(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(key, _)| STRIPPED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Text of a scalar metadata value. YAML often types versions as numbers.
///
/// Only integers are accepted: a float has already lost its spelling
/// (`1.10` reads back as `1.1`).
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

/// The parsed document of a combined family file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FamilyDocument {
    pub family: Metadata,
    /// Per-version overlays, each already filled in with the family keys it
    /// does not define itself.
    pub overlays: Vec<Metadata>,
}

impl FamilyDocument {
    pub fn from_value(path: &Path, value: Value) -> Result<Self> {
        let invalid = |reason: &str| PackageError::InvalidMetadata {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        match value {
            Value::Object(family) => Ok(Self {
                family,
                overlays: Vec::new(),
            }),
            Value::Array(entries) => {
                let mut entries = entries.into_iter();
                let family = match entries.next() {
                    Some(Value::Object(map)) => map,
                    _ => return Err(invalid("first entry must be the family mapping").into()),
                };

                let overlays = entries
                    .map(|entry| match entry {
                        Value::Object(mut overlay) => {
                            for (key, value) in &family {
                                overlay.entry(key.clone()).or_insert_with(|| value.clone());
                            }
                            Ok(overlay)
                        }
                        _ => Err(invalid("version overlays must be mappings").into()),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self { family, overlays })
            }
            _ => Err(invalid("expected a mapping or a list of mappings").into()),
        }
    }

    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let value = load_document(runtime, path)?;
        Self::from_value(path, value)
            .with_context(|| format!("Failed to load package family from {:?}", path))
    }
}
