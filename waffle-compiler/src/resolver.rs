//! Resolution of import identifiers to file contents.
//!
//! An import identifier is looked up in two places, in order:
//!
//!   1. as a path relative to the project root (the current working directory by default)
//!   2. relative to the package-dependency root, like `node_modules`
//!
//! A miss is not an error, it is returned as [`ImportResolution::Error`] so the caller, the
//! compiler or the flattener, can decide what to do with it.

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// The outcome of resolving a single import.
///
/// Serializes to `{"contents": ...}` or `{"error": ...}`, the shape compiler libraries expect
/// from an import callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportResolution {
    Contents(String),
    Error(String),
}

impl ImportResolution {
    /// Returns the resolved contents, if any
    pub fn contents(&self) -> Option<&str> {
        match self {
            ImportResolution::Contents(c) => Some(c),
            ImportResolution::Error(_) => None,
        }
    }

    /// Returns the reason of a miss, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            ImportResolution::Contents(_) => None,
            ImportResolution::Error(e) => Some(e),
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, ImportResolution::Error(_))
    }

    /// The miss value for an import that could not be found anywhere
    pub fn not_found(import: &str) -> Self {
        ImportResolution::Error(format!("File not found: {import}"))
    }
}

/// A capability to resolve imports on demand.
///
/// Backends that hand files to the compiler by path ignore it, the in-process library backend
/// calls it whenever the compiler hits an import it does not know yet.
pub trait ImportCallback: Send + Sync {
    fn resolve(&self, import: &str) -> ImportResolution;
}

impl<F> ImportCallback for F
where
    F: Fn(&str) -> ImportResolution + Send + Sync,
{
    fn resolve(&self, import: &str) -> ImportResolution {
        self(import)
    }
}

/// Resolves imports against the project root and the package-dependency root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResolver {
    root: Option<PathBuf>,
    package_root: PathBuf,
}

impl ImportResolver {
    /// Resolves imports relative to the current working directory first, then relative to
    /// `package_root`
    pub fn new(package_root: impl Into<PathBuf>) -> Self {
        Self { root: None, package_root: package_root.into() }
    }

    /// Resolves against the configured project root and package root, the same directories
    /// the docker backend mounts
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.npm_path).with_root(&config.root_path)
    }

    /// Resolves direct imports relative to `root` instead of the working directory
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn package_root(&self) -> &Path {
        &self.package_root
    }

    /// Returns the file an import identifier points to without reading it
    pub fn locate(&self, import: &str) -> Option<PathBuf> {
        let direct = match &self.root {
            Some(root) => root.join(import),
            None => PathBuf::from(import),
        };
        if direct.is_file() {
            return Some(direct)
        }
        let lib = self.package_root.join(import);
        if lib.is_file() {
            tracing::trace!("resolved \"{}\" in package root {}", import, self.package_root.display());
            return Some(lib)
        }
        None
    }

    /// Returns the content of the file an import identifier points to
    pub fn resolve(&self, import: &str) -> ImportResolution {
        match self.locate(import) {
            Some(path) => match fs::read_to_string(&path) {
                Ok(contents) => ImportResolution::Contents(contents),
                Err(err) => {
                    tracing::warn!("failed to read import \"{}\": {}", path.display(), err);
                    ImportResolution::Error(format!("Failed to read {}: {err}", path.display()))
                }
            },
            None => {
                tracing::trace!("import \"{}\" not found", import);
                ImportResolution::not_found(import)
            }
        }
    }
}

impl ImportCallback for ImportResolver {
    fn resolve(&self, import: &str) -> ImportResolution {
        ImportResolver::resolve(self, import)
    }
}
