use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::{package::PackageIndex, runtime::Runtime, settings::Settings};

/// What every command needs: storage access and the effective settings.
pub struct Config<R: Runtime> {
    pub runtime: R,
    pub settings: Settings,
}

impl<R: Runtime> Config<R> {
    /// Load settings, letting explicit `paths` replace the configured search path.
    pub fn load(runtime: R, paths: Vec<PathBuf>) -> Result<Self> {
        let mut settings = Settings::load(&runtime)?;
        if !paths.is_empty() {
            debug!("Search path overridden: {:?}", paths);
            settings.packages_path = paths;
        }
        Ok(Self { runtime, settings })
    }

    pub fn index(&self) -> PackageIndex<'_, R> {
        PackageIndex::new(&self.runtime, &self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    fn runtime() -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));
        runtime
            .expect_env_var()
            .returning(|_| Err(std::env::VarError::NotPresent));
        runtime.expect_exists().returning(|_| false);
        runtime
    }

    #[test]
    fn test_config_uses_settings_path() {
        let config = Config::load(runtime(), Vec::new()).unwrap();
        assert_eq!(
            config.index().search_path().roots(),
            &[PathBuf::from("/home/user/packages")]
        );
    }

    #[test]
    fn test_config_path_override() {
        let config = Config::load(runtime(), vec![PathBuf::from("/a"), PathBuf::from("/b")]).unwrap();
        assert_eq!(
            config.settings.packages_path,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert_eq!(config.settings.local_packages_path, PathBuf::from("/home/user/packages"));
    }
}
