//! Configuration, layered from defaults, an optional settings file and the
//! environment.
//!
//! The settings file is YAML or JSON (chosen by extension, YAML otherwise):
//!
//! ```yaml
//! packages_path: [~/packages, /studio/packages]
//! local_packages_path: ~/packages
//! warn_untimestamped: true
//! package_orderers:
//!   - type: version_split
//!     packages: [python]
//!     first_version: 2.7.16
//! ```

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::order::{OrdererRegistry, PackageOrder, from_pod};
use crate::runtime::{Runtime, expand_home};

pub const SETTINGS_FILE_ENV: &str = "PKGREPO_SETTINGS_FILE";
pub const PACKAGES_PATH_ENV: &str = "PKGREPO_PACKAGES_PATH";
pub const LOCAL_PACKAGES_PATH_ENV: &str = "PKGREPO_LOCAL_PACKAGES_PATH";
pub const WARN_UNTIMESTAMPED_ENV: &str = "PKGREPO_WARN_UNTIMESTAMPED";

/// Settings file looked up in the home directory when no file is named.
pub const DEFAULT_SETTINGS_FILE: &str = ".pkgreporc";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    /// Ordered package roots; earlier roots win.
    pub packages_path: Vec<PathBuf>,
    /// Packages under this root are local and never timestamped.
    pub local_packages_path: PathBuf,
    /// Warn once per package that has no release time.
    pub warn_untimestamped: bool,
    pub package_orderers: Vec<PackageOrder>,
}

impl Settings {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R) -> Result<Self> {
        let home = runtime.home_dir();
        let packages = home
            .as_deref()
            .map(|h| h.join("packages"))
            .unwrap_or_else(|| PathBuf::from("packages"));
        let mut settings = Settings {
            packages_path: vec![packages.clone()],
            local_packages_path: packages,
            ..Settings::default()
        };

        if let Some(path) = settings_file(runtime, home.as_deref()) {
            debug!("Loading settings from {:?}", path);
            settings
                .apply_file(runtime, &path)
                .with_context(|| format!("Failed to load settings from {:?}", path))?;
        }
        settings.apply_env(runtime)?;

        settings.packages_path = settings
            .packages_path
            .iter()
            .map(|p| expand_home(p, home.as_deref()))
            .collect();
        settings.local_packages_path = expand_home(&settings.local_packages_path, home.as_deref());
        Ok(settings)
    }

    /// The configured orderers, indexed by family.
    pub fn orderers(&self) -> Result<OrdererRegistry> {
        OrdererRegistry::new(self.package_orderers.clone())
    }

    fn apply_file<R: Runtime>(&mut self, runtime: &R, path: &Path) -> Result<()> {
        let content = runtime.read_to_string(path)?;
        let document: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ if content.trim().is_empty() => Value::Null,
            _ => serde_yaml::from_str(&content)?,
        };

        let entries = match document {
            Value::Null => return Ok(()),
            Value::Object(entries) => entries,
            _ => bail!("Settings file must hold a mapping"),
        };

        for (key, value) in entries {
            match key.as_str() {
                "packages_path" => {
                    self.packages_path = match value {
                        Value::String(path) => vec![PathBuf::from(path)],
                        value => serde_json::from_value(value)
                            .context("'packages_path' must be a list of paths")?,
                    }
                }
                "local_packages_path" => {
                    self.local_packages_path = serde_json::from_value(value)
                        .context("'local_packages_path' must be a path")?
                }
                "warn_untimestamped" => {
                    self.warn_untimestamped = serde_json::from_value(value)
                        .context("'warn_untimestamped' must be a boolean")?
                }
                "package_orderers" => {
                    self.package_orderers = match value {
                        Value::Null => Vec::new(),
                        Value::Array(pods) => pods.iter().map(from_pod).collect::<Result<_>>()?,
                        pod => vec![from_pod(&pod)?],
                    }
                }
                other => warn!("Ignoring unknown setting '{}' in {:?}", other, path),
            }
        }
        Ok(())
    }

    fn apply_env<R: Runtime>(&mut self, runtime: &R) -> Result<()> {
        if let Ok(value) = runtime.env_var(PACKAGES_PATH_ENV) {
            self.packages_path = std::env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Ok(value) = runtime.env_var(LOCAL_PACKAGES_PATH_ENV) {
            self.local_packages_path = PathBuf::from(value);
        }
        if let Ok(value) = runtime.env_var(WARN_UNTIMESTAMPED_ENV) {
            self.warn_untimestamped = parse_bool(&value)
                .with_context(|| format!("Invalid value for {}", WARN_UNTIMESTAMPED_ENV))?;
        }
        Ok(())
    }
}

fn settings_file<R: Runtime>(runtime: &R, home: Option<&Path>) -> Option<PathBuf> {
    if let Ok(path) = runtime.env_var(SETTINGS_FILE_ENV) {
        return Some(expand_home(Path::new(&path), home));
    }
    let path = home?.join(DEFAULT_SETTINGS_FILE);
    runtime.exists(&path).then_some(path)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        other => bail!("expected a boolean, got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{VersionSplitPackageOrder, get_orderer};
    use crate::runtime::MockRuntime;
    use crate::version::Version;
    use std::collections::HashMap;

    fn mock_runtime(env: &[(&str, &str)], files: &[(&str, &str)]) -> MockRuntime {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let files: HashMap<PathBuf, String> = files
            .iter()
            .map(|(k, v)| (PathBuf::from(k), v.to_string()))
            .collect();
        let existing = files.clone();

        let mut runtime = MockRuntime::new();
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));
        runtime
            .expect_env_var()
            .returning(move |key| env.get(key).cloned().ok_or(std::env::VarError::NotPresent));
        runtime
            .expect_exists()
            .returning(move |path| existing.contains_key(path));
        runtime.expect_read_to_string().returning(move |path| {
            files
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("not found: {:?}", path))
        });
        runtime
    }

    #[test]
    fn test_load_defaults() {
        let runtime = mock_runtime(&[], &[]);
        let settings = Settings::load(&runtime).unwrap();

        assert_eq!(settings.packages_path, vec![PathBuf::from("/home/user/packages")]);
        assert_eq!(settings.local_packages_path, PathBuf::from("/home/user/packages"));
        assert!(!settings.warn_untimestamped);
        assert!(settings.package_orderers.is_empty());
    }

    #[test_log::test]
    fn test_load_home_settings_file() {
        let runtime = mock_runtime(
            &[],
            &[(
                "/home/user/.pkgreporc",
                "packages_path: [~/dev, /studio/packages]\n\
                 warn_untimestamped: true\n\
                 package_orderers:\n  - type: version_split\n    packages: [python]\n    first_version: 2.6.0\n\
                 memcached_uri: localhost\n",
            )],
        );
        let settings = Settings::load(&runtime).unwrap();

        assert_eq!(
            settings.packages_path,
            vec![PathBuf::from("/home/user/dev"), PathBuf::from("/studio/packages")]
        );
        assert!(settings.warn_untimestamped);

        let registry = settings.orderers().unwrap();
        assert_eq!(
            get_orderer("python", &registry),
            &PackageOrder::from(VersionSplitPackageOrder::new(
                ["python"],
                Version::parse("2.6.0").unwrap()
            ))
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let runtime = mock_runtime(
            &[
                (SETTINGS_FILE_ENV, "~/site.json"),
                (PACKAGES_PATH_ENV, "/a:/b"),
                (LOCAL_PACKAGES_PATH_ENV, "~/local"),
                (WARN_UNTIMESTAMPED_ENV, "no"),
            ],
            &[(
                "/home/user/site.json",
                r#"{"packages_path": ["/ignored"], "warn_untimestamped": true}"#,
            )],
        );
        let settings = Settings::load(&runtime).unwrap();

        assert_eq!(settings.packages_path, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(settings.local_packages_path, PathBuf::from("/home/user/local"));
        assert!(!settings.warn_untimestamped);
    }

    #[test]
    fn test_invalid_boolean_is_an_error() {
        let runtime = mock_runtime(&[(WARN_UNTIMESTAMPED_ENV, "maybe")], &[]);
        assert!(Settings::load(&runtime).is_err());
    }

    #[test]
    fn test_bad_orderer_in_file_is_an_error() {
        let runtime = mock_runtime(
            &[],
            &[("/home/user/.pkgreporc", "package_orderers:\n  - type: bogus\n")],
        );
        assert!(Settings::load(&runtime).is_err());
    }

    #[test]
    fn test_missing_named_file_is_an_error() {
        let runtime = mock_runtime(&[(SETTINGS_FILE_ENV, "/etc/pkgrepo.yaml")], &[]);
        assert!(Settings::load(&runtime).is_err());
    }

    #[test]
    fn test_parse_bool() {
        for yes in ["1", "true", "Yes", "y"] {
            assert!(parse_bool(yes).unwrap());
        }
        for no in ["0", "false", "NO", "n"] {
            assert!(!parse_bool(no).unwrap());
        }
        assert!(parse_bool("").is_err());
    }
}
