//! Typed errors for package discovery, ordering and installation.
//!
//! Functions return `anyhow::Result`; callers that need to branch on the
//! failure downcast to [`PackageError`] or [`crate::version::VersionError`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Invalid package family name '{0}'")]
    InvalidName(String),

    #[error("Invalid package string '{0}'")]
    InvalidPackageString(String),

    #[error("Package '{name}' metafile {path:?} has no file extension")]
    MissingExtension { name: String, path: PathBuf },

    #[error("Unknown package orderer type {0:?}")]
    UnknownOrderer(Option<String>),

    #[error("Package family '{0}' is governed by more than one orderer")]
    DuplicateOrderer(String),

    #[error("Cannot install {package}: {reason}")]
    InstallConflict { package: String, reason: String },

    #[error("Invalid package metadata in {path:?}: {reason}")]
    InvalidMetadata { path: PathBuf, reason: String },
}
