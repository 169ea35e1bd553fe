//! Portable form of orderers: plain mappings tagged by `type`, as they
//! appear in settings files.

use anyhow::{Context, Result};
use serde_json::Value;

use super::registry::OrdererRegistry;
use super::{ORDERER_TYPES, PackageOrder};
use crate::error::PackageError;

pub fn to_pod(orderer: &PackageOrder) -> Result<Value> {
    serde_json::to_value(orderer).context("Failed to serialize package orderer")
}

/// Rebuild an orderer from its portable form.
///
/// Fails with [`PackageError::UnknownOrderer`] when a `type` tag is missing
/// or not one of [`ORDERER_TYPES`], at any nesting level.
pub fn from_pod(pod: &Value) -> Result<PackageOrder> {
    check_types(pod)?;
    let orderer: PackageOrder =
        serde_json::from_value(pod.clone()).context("Invalid package orderer")?;
    orderer.validate()?;
    Ok(orderer)
}

pub fn registry_to_pod(registry: &OrdererRegistry) -> Result<Value> {
    registry
        .orderers()
        .iter()
        .map(to_pod)
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// Accepts a list of orderer pods, or a single one.
pub fn registry_from_pod(pod: &Value) -> Result<OrdererRegistry> {
    let orderers = match pod {
        Value::Array(items) => items.iter().map(from_pod).collect::<Result<Vec<_>>>()?,
        Value::Null => Vec::new(),
        single => vec![from_pod(single)?],
    };
    OrdererRegistry::new(orderers)
}

fn check_types(pod: &Value) -> Result<()> {
    let tag = pod.get("type").and_then(Value::as_str);
    match tag {
        Some(tag) if ORDERER_TYPES.contains(&tag) => {}
        _ => return Err(PackageError::UnknownOrderer(tag.map(str::to_string)).into()),
    }

    if tag == Some("per_family") {
        if let Some(Value::Array(orderers)) = pod.get("orderers") {
            orderers.iter().try_for_each(check_types)?;
        }
        if let Some(default_order) = pod.get("default_order")
            && !default_order.is_null()
        {
            check_types(default_order)?;
        }
    }
    Ok(())
}
