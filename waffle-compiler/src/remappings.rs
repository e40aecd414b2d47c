use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// The solidity compiler can only reference files that exist locally on your computer.
///
/// A remapping tells it where a package-style import lives, `prefix=target`:
///
/// ```text
/// solc openzeppelin-solidity=/abs/path/node_modules/openzeppelin-solidity ./MyContract.sol
/// ```
#[derive(Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct Remapping {
    pub name: String,
    pub path: String,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq, PartialOrd)]
pub enum RemappingError {
    #[error("invalid remapping format, found `{0}`, expected `<key>=<value>`")]
    InvalidRemapping(String),
    #[error("remapping key can't be empty, found `{0}`, expected `<key>=<value>`")]
    EmptyRemappingKey(String),
    #[error("remapping value must be a path, found `{0}`, expected `<key>=<value>`")]
    EmptyRemappingValue(String),
}

impl FromStr for Remapping {
    type Err = RemappingError;

    fn from_str(remapping: &str) -> Result<Self, Self::Err> {
        let (name, path) = remapping
            .split_once('=')
            .ok_or_else(|| RemappingError::InvalidRemapping(remapping.to_string()))?;
        if name.trim().is_empty() {
            return Err(RemappingError::EmptyRemappingKey(remapping.to_string()))
        }
        if path.trim().is_empty() {
            return Err(RemappingError::EmptyRemappingValue(remapping.to_string()))
        }
        Ok(Remapping { name: name.to_string(), path: path.to_string() })
    }
}

impl Serialize for Remapping {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Remapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let remapping = String::deserialize(deserializer)?;
        Remapping::from_str(&remapping).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Remapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.path)
    }
}

impl Remapping {
    /// Returns one remapping per package installed under `packages`.
    ///
    /// Every directory directly under `packages` is a package, scoped directories (`@org`)
    /// contribute one package per subdirectory. The target of each remapping is the package
    /// directory joined onto `target_prefix`, rendered with `/` separators.
    ///
    /// Returns an empty list if `packages` does not exist.
    pub fn find_packages(packages: impl AsRef<Path>, target_prefix: impl AsRef<Path>) -> Vec<Remapping> {
        let packages = packages.as_ref();
        let target_prefix = target_prefix.as_ref();
        let mut remappings = Vec::new();
        for name in sorted_dirs(packages) {
            if name.starts_with('@') {
                for scoped in sorted_dirs(&packages.join(&name)) {
                    let package = format!("{name}/{scoped}");
                    remappings.push(Remapping::package(&package, target_prefix));
                }
            } else {
                remappings.push(Remapping::package(&name, target_prefix));
            }
        }
        tracing::trace!("found {} package remappings in {}", remappings.len(), packages.display());
        remappings
    }

    fn package(name: &str, target_prefix: &Path) -> Remapping {
        let path: PathBuf = target_prefix.join(name);
        Remapping { name: name.to_string(), path: crate::utils::slash_string(&path) }
    }
}

fn sorted_dirs(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
