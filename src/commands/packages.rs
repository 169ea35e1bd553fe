use anyhow::Result;

use crate::runtime::Runtime;

use super::config::Config;

/// Print package short names. Shadowed duplicates are shown only with `all`.
#[tracing::instrument(skip(config))]
pub fn packages<R: Runtime>(config: &Config<R>, name: Option<&str>, all: bool) -> Result<()> {
    let index = config.index();
    for package in index.packages(name, !all)? {
        let package = package?;
        if all {
            println!("{}\t{}", package.short_name(), package.metafile.display());
        } else {
            println!("{}", package.short_name());
        }
    }
    Ok(())
}
