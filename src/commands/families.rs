use anyhow::Result;
use log::{debug, warn};

use crate::runtime::Runtime;

use super::config::Config;

/// Print family names with their locations, in search order.
#[tracing::instrument(skip(config))]
pub fn families<R: Runtime>(config: &Config<R>, name: Option<&str>) -> Result<()> {
    let index = config.index();
    let mut found = 0;

    for family in index.families(name)? {
        match family {
            Ok(family) => {
                found += 1;
                println!("{}\t{}", family.name(), family.location().display());
            }
            Err(e) => warn!("{:#}", e),
        }
    }

    debug!("Found {} package families", found);
    if found == 0 {
        println!("No package families found.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::settings::Settings;
    use std::path::{Path, PathBuf};

    #[test_log::test]
    fn test_families_missing_root() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_is_dir()
            .withf(|p| p == Path::new("/missing"))
            .returning(|_| false);

        let config = Config {
            runtime,
            settings: Settings {
                packages_path: vec![PathBuf::from("/missing")],
                ..Settings::default()
            },
        };
        assert!(families(&config, None).is_ok());
    }

    #[test]
    fn test_families_invalid_name() {
        let config = Config {
            runtime: MockRuntime::new(),
            settings: Settings::default(),
        };
        assert!(families(&config, Some("no-such")).is_err());
    }
}
