use anyhow::Result;

use crate::{package::expand_requirement, runtime::Runtime};

use super::config::Config;

#[tracing::instrument(skip(config))]
pub fn expand<R: Runtime>(config: &Config<R>, request: &str) -> Result<()> {
    let expanded = expand_requirement(&config.index(), request)?;
    println!("{}", expanded);
    Ok(())
}
