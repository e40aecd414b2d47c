use super::{run_standard_json, selection, source_key, DEFAULT_PROCESS_SELECTION};
use crate::{
    artifacts::{CompilerInput, CompilerOutput, Source},
    config::{Config, DEFAULT_DOCKER_TAG},
    error::{CompilerError, Result},
    remappings::Remapping,
    utils,
};
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

/// The image `solc` runs in
pub const DOCKER_IMAGE: &str = "ethereum/solc";

/// Where the project root is mounted inside the container
pub const CONTAINER_ROOT: &str = "/home/project";

/// `solc` running inside the `ethereum/solc` docker image.
///
/// The project root is bind-mounted to [`CONTAINER_ROOT`], so every path handed to the compiler
/// is rewritten to its in-container location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerSolc {
    /// Absolute host path of the project root
    pub host_root: PathBuf,
    /// Package root on the host
    pub npm_path: PathBuf,
    /// Tag of the compiler image, `stable` by default
    pub tag: String,
    /// Selectors requested for every contract
    pub output_selection: Vec<String>,
}

impl DockerSolc {
    /// A new instance mounting `host_root`, using the packages under `npm_path`
    pub fn new(host_root: impl AsRef<Path>, npm_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            host_root: utils::absolute(host_root)?,
            npm_path: npm_path.into(),
            tag: DEFAULT_DOCKER_TAG.to_string(),
            output_selection: DEFAULT_PROCESS_SELECTION.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            tag: config.docker_tag.clone(),
            output_selection: selection(config, &DEFAULT_PROCESS_SELECTION),
            ..Self::new(&config.root_path, &config.npm_path)?
        })
    }

    /// Pins the image tag, like `0.4.24`
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Maps a host path to its location inside the container
    pub fn container_path(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let absolute = utils::absolute(path)?;
        let relative = absolute.strip_prefix(&self.host_root).map_err(|_| {
            CompilerError::msg(format!(
                "\"{}\" is outside of the mounted project root \"{}\"",
                path.display(),
                self.host_root.display()
            ))
        })?;
        Ok(utils::slash_string(&Path::new(CONTAINER_ROOT).join(relative)))
    }

    /// Builds the standard-json input, every source refers to its in-container path
    pub fn build_input(&self, files: &[PathBuf]) -> Result<CompilerInput> {
        let mut sources = BTreeMap::new();
        for file in files {
            sources.insert(source_key(file), Source::url(self.container_path(file)?));
        }
        let remappings = if self.npm_path.is_dir() {
            Remapping::find_packages(&self.npm_path, self.container_path(&self.npm_path)?)
        } else {
            Vec::new()
        };
        Ok(CompilerInput::new(sources, remappings, self.output_selection.iter().cloned()))
    }

    fn image(&self) -> String {
        format!("{DOCKER_IMAGE}:{}", self.tag)
    }

    fn volume(&self) -> String {
        format!("{}:{CONTAINER_ROOT}", self.host_root.display())
    }

    /// The command line this backend runs
    pub fn build_command(&self) -> String {
        format!(
            "docker run -v {} -i -a stdin -a stdout {} solc --standard-json --allow-paths \"{CONTAINER_ROOT}\"",
            self.volume(),
            self.image()
        )
    }

    fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("docker");
        cmd.arg("run")
            .arg("-v")
            .arg(self.volume())
            .args(["-i", "-a", "stdin", "-a", "stdout"])
            .arg(self.image())
            .args(["solc", "--standard-json", "--allow-paths", CONTAINER_ROOT]);
        cmd
    }

    /// Run `solc --standard-json` on `files` inside the container
    pub async fn compile(&self, files: &[PathBuf]) -> Result<CompilerOutput> {
        let input = self.build_input(files)?;
        self.compile_input(&input).await
    }

    /// Run `solc --standard-json` on a prepared input inside the container
    pub async fn compile_input(&self, input: &CompilerInput) -> Result<CompilerOutput> {
        tracing::debug!("compiling with {}", self.image());
        run_standard_json(self.command(), "docker", input).await
    }
}

impl fmt::Display for DockerSolc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build_command())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::create_dir_all;

    fn project() -> (tempfile::TempDir, DockerSolc) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        create_dir_all(root.join("custom/custom_contracts/sub")).unwrap();
        create_dir_all(root.join("custom/custom_node_modules/openzeppelin-solidity")).unwrap();
        let docker = DockerSolc::new(root, root.join("custom/custom_node_modules")).unwrap();
        (tmp, docker)
    }

    #[test]
    fn empty_sources() {
        let (_tmp, docker) = project();
        let input = docker.build_input(&[]).unwrap();
        assert_eq!(
            serde_json::to_value(input).unwrap(),
            serde_json::json!({
                "language": "Solidity",
                "sources": {},
                "settings": {
                    "remappings": ["openzeppelin-solidity=/home/project/custom/custom_node_modules/openzeppelin-solidity"],
                    "outputSelection": { "*": { "*": ["metadata", "evm.bytecode"] } }
                }
            })
        );
    }

    #[test]
    fn rewrites_sources_to_container_paths() {
        let (tmp, docker) = project();
        let files: Vec<_> = ["custom/custom_contracts/Custom.sol", "custom/custom_contracts/sub/One.sol"]
            .iter()
            .map(|f| tmp.path().join(f))
            .collect();
        let input = docker.build_input(&files).unwrap();
        let urls: Vec<_> = input
            .sources
            .values()
            .map(|s| match s {
                Source::Urls { urls } => urls[0].clone(),
                Source::Content { .. } => panic!("expected url source"),
            })
            .collect();
        assert_eq!(
            urls,
            vec![
                "/home/project/custom/custom_contracts/Custom.sol",
                "/home/project/custom/custom_contracts/sub/One.sol"
            ]
        );
    }

    #[test]
    fn rejects_files_outside_of_root() {
        let (_tmp, docker) = project();
        let outside = tempfile::tempdir().unwrap();
        assert!(docker.container_path(outside.path().join("A.sol")).is_err());
    }

    #[test]
    fn builds_command_without_tag() {
        let (_tmp, docker) = project();
        let command = docker.build_command();
        assert!(command.starts_with("docker run -v"));
        assert!(command.ends_with(
            ":/home/project -i -a stdin -a stdout ethereum/solc:stable solc --standard-json --allow-paths \"/home/project\""
        ));
    }

    #[test]
    fn builds_command_with_pinned_tag() {
        let (_tmp, docker) = project();
        let command = docker.tag("0.4.24").build_command();
        assert!(command.starts_with("docker run -v"));
        assert!(command.ends_with(
            ":/home/project -i -a stdin -a stdout ethereum/solc:0.4.24 solc --standard-json --allow-paths \"/home/project\""
        ));
    }

    #[test]
    fn tag_comes_from_config() {
        let config = Config::default().docker_tag("0.5.9");
        let docker = DockerSolc::from_config(&config).unwrap();
        assert_eq!(docker.tag, "0.5.9");
        assert_eq!(docker.host_root, std::env::current_dir().unwrap());
    }
}
