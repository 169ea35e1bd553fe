use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

use crate::{
    order::{ReleaseHistory, get_orderer, registry_from_pod},
    package::{load_document, validate_name},
    runtime::Runtime,
};

use super::config::Config;

/// Print the versions of a family, most preferred first.
///
/// Orderers come from `orderers_file` when given, else from the settings.
#[tracing::instrument(skip(config))]
pub fn order<R: Runtime>(config: &Config<R>, name: &str, orderers_file: Option<&Path>) -> Result<()> {
    validate_name(name)?;

    let registry = match orderers_file {
        Some(path) => {
            let pod = load_document(&config.runtime, path)?;
            registry_from_pod(&pod).with_context(|| format!("Invalid orderers in {:?}", path))?
        }
        None => config.settings.orderers()?,
    };

    let orderer = get_orderer(name, &registry);
    debug!("Ordering '{}' with {}", name, orderer.type_name());

    let index = config.index();
    let versions = index.versions(name)?;
    if versions.is_empty() {
        println!("No packages found for '{}'.", name);
        return Ok(());
    }

    let history: &dyn ReleaseHistory = &index;
    for version in orderer.order_versions(name, versions, history) {
        println!("{}", version);
    }
    Ok(())
}
