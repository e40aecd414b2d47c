use crate::error::{CompilerError, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf};

/// The name of the `solc` binary on the system
pub const SOLC: &str = "solc";

/// The image tag used by the containerized compiler when none is configured
pub const DEFAULT_DOCKER_TAG: &str = "stable";

/// Which backend executes the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompilerKind {
    /// A `solc` executable on the local machine
    #[default]
    #[serde(rename = "native")]
    Native,
    /// `solc` inside the `ethereum/solc` docker image
    #[serde(rename = "dockerized-solc", alias = "docker")]
    Docker,
    /// A compiler library running in this process
    #[serde(rename = "solcjs", alias = "library")]
    Library,
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerKind::Native => f.write_str("native"),
            CompilerKind::Docker => f.write_str("dockerized-solc"),
            CompilerKind::Library => f.write_str("solcjs"),
        }
    }
}

/// Where to find sources, where to write output and which compiler to use.
///
/// All relative paths are interpreted relative to the process working directory. Imports are
/// resolved against `root_path` first, then against `npm_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Project root, mounted into the container by the docker backend
    pub root_path: PathBuf,
    /// Where to find sources
    pub sources_path: PathBuf,
    /// Where to store build artifacts
    pub target_path: PathBuf,
    /// Where installed packages live, like `node_modules`
    pub npm_path: PathBuf,
    /// Which backend to compile with
    pub compiler: CompilerKind,
    /// Path to the `solc` executable used by the native backend
    pub solc_path: PathBuf,
    /// Tag of the `ethereum/solc` image used by the docker backend
    #[serde(alias = "docker-tag")]
    pub docker_tag: String,
    /// Replaces the backend's default output selectors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_selection: Option<Vec<String>>,
    /// Where flattened files are written
    pub flatten_output_directory: PathBuf,
    /// Only files ending with this are treated as sources
    pub source_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            sources_path: PathBuf::from("./contracts"),
            target_path: PathBuf::from("./build"),
            npm_path: PathBuf::from("./node_modules"),
            compiler: CompilerKind::default(),
            solc_path: std::env::var("SOLC_PATH").map(PathBuf::from).unwrap_or_else(|_| SOLC.into()),
            docker_tag: DEFAULT_DOCKER_TAG.to_string(),
            output_selection: None,
            flatten_output_directory: PathBuf::from("./flatten"),
            source_extension: ".sol".to_string(),
        }
    }
}

impl Config {
    /// Reads a json config file, every missing field falls back to its default
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        tracing::trace!("reading config at {}", path.display());
        let content = fs::read_to_string(&path).map_err(|err| CompilerError::io(err, &path))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Same as [`Config::load`] but returns the default config if no path is given
    pub fn load_or_default(path: Option<impl Into<PathBuf>>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Sets the project root
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_path = root.into();
        self
    }

    /// Sets the compiler backend
    #[must_use]
    pub fn compiler(mut self, compiler: CompilerKind) -> Self {
        self.compiler = compiler;
        self
    }

    /// Sets the sources directory
    #[must_use]
    pub fn sources(mut self, sources: impl Into<PathBuf>) -> Self {
        self.sources_path = sources.into();
        self
    }

    /// Sets the artifacts directory
    #[must_use]
    pub fn target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target_path = target.into();
        self
    }

    /// Sets the package-dependency root
    #[must_use]
    pub fn npm(mut self, npm: impl Into<PathBuf>) -> Self {
        self.npm_path = npm.into();
        self
    }

    /// Sets the docker image tag
    #[must_use]
    pub fn docker_tag(mut self, tag: impl Into<String>) -> Self {
        self.docker_tag = tag.into();
        self
    }

    /// Sets the directory flattened files are written to
    #[must_use]
    pub fn flatten_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.flatten_output_directory = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn can_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sourcesPath": "./src", "compiler": "dockerized-solc", "docker-tag": "0.4.24"}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sources_path, PathBuf::from("./src"));
        assert_eq!(config.compiler, CompilerKind::Docker);
        assert_eq!(config.docker_tag, "0.4.24");
        assert_eq!(config.target_path, PathBuf::from("./build"));
        assert_eq!(config.npm_path, PathBuf::from("./node_modules"));
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let err = Config::load("does/not/exist.json").unwrap_err();
        assert!(matches!(err, CompilerError::Io(_)));
    }

    #[test]
    fn defaults_to_native_and_stable() {
        let config = Config::load_or_default(None::<PathBuf>).unwrap();
        assert_eq!(config.compiler, CompilerKind::Native);
        assert_eq!(config.docker_tag, DEFAULT_DOCKER_TAG);
        assert_eq!(config.source_extension, ".sol");
    }

    #[test]
    fn compiler_kind_roundtrips_names() {
        for kind in [CompilerKind::Native, CompilerKind::Docker, CompilerKind::Library] {
            let s = serde_json::to_string(&kind).unwrap();
            assert_eq!(s, format!("\"{kind}\""));
        }
    }
}
