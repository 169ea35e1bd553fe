use anyhow::Result;
use std::path::Path;

use crate::{install::VariantInstaller, package::Package, runtime::Runtime};

use super::config::Config;

/// Install every variant of the developer package in `source` into `repo`.
#[tracing::instrument(skip(config))]
pub fn install<R: Runtime>(config: &Config<R>, source: &Path, repo: &Path, dry_run: bool) -> Result<()> {
    let package = Package::developer_package(&config.runtime, source)?;
    let installer = VariantInstaller::new(&config.runtime, repo);

    for variant in package.iter_variants(&config.runtime)? {
        let name = variant.qualified_name();
        if dry_run {
            match installer.dry_run(&variant)? {
                Some(outcome) => println!("{}: would be {}", name, outcome),
                None => println!("{}: unchanged", name),
            }
        } else {
            let outcome = installer.install(&variant)?;
            println!("{}: {}", name, outcome);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use crate::test_utils::RepoFixture;

    #[test]
    fn test_install_dry_run_writes_nothing() {
        let fixture = RepoFixture::new();
        let repo = fixture.path().join("installed");
        let config = Config {
            runtime: RealRuntime,
            settings: fixture.settings(),
        };

        install(&config, &fixture.developer("developer"), &repo, true).unwrap();
        assert!(!repo.exists());

        install(&config, &fixture.developer("developer"), &repo, false).unwrap();
        assert!(repo.join("foo").join("3.0.1").join("package.json").is_file());
    }
}
