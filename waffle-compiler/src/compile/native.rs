use super::{run_standard_json, selection, source_key, DEFAULT_PROCESS_SELECTION};
use crate::{
    artifacts::{CompilerInput, CompilerOutput, Source},
    config::{Config, SOLC},
    error::{BackendError, Result},
    remappings::Remapping,
    utils,
};
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
};

/// Abstraction over a local `solc` executable.
///
/// Sources are passed by absolute path, `solc` reads them itself. Reads outside of the working
/// directory are only allowed below the package root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSolc {
    /// Path to the `solc` executable
    pub solc: PathBuf,
    /// The package root, passed as `--allow-paths`
    pub allow_paths: PathBuf,
    /// Selectors requested for every contract
    pub output_selection: Vec<String>,
}

impl Default for NativeSolc {
    fn default() -> Self {
        Self {
            solc: SOLC.into(),
            allow_paths: PathBuf::from("node_modules"),
            output_selection: DEFAULT_PROCESS_SELECTION.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl NativeSolc {
    /// A new instance running `solc` with access to the packages under `package_root`
    pub fn new(solc: impl Into<PathBuf>, package_root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self { solc: solc.into(), allow_paths: utils::absolute(package_root)?, ..Default::default() })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            output_selection: selection(config, &DEFAULT_PROCESS_SELECTION),
            ..Self::new(&config.solc_path, &config.npm_path)?
        })
    }

    /// Builds the standard-json input, every source refers to its absolute path
    pub fn build_input(&self, files: &[PathBuf]) -> Result<CompilerInput> {
        let mut sources = BTreeMap::new();
        for file in files {
            let url = utils::slash_string(&utils::absolute(file)?);
            sources.insert(source_key(file), Source::url(url));
        }
        let remappings = Remapping::find_packages(&self.allow_paths, &self.allow_paths);
        Ok(CompilerInput::new(sources, remappings, self.output_selection.iter().cloned()))
    }

    /// The command line this backend runs
    pub fn build_command(&self) -> String {
        format!("{} --standard-json --allow-paths {}", self.solc.display(), self.allow_paths.display())
    }

    fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.solc);
        cmd.arg("--standard-json").arg("--allow-paths").arg(&self.allow_paths);
        cmd
    }

    /// Run `solc --standard-json` on `files`
    pub async fn compile(&self, files: &[PathBuf]) -> Result<CompilerOutput> {
        let input = self.build_input(files)?;
        self.compile_input(&input).await
    }

    /// Run `solc --standard-json` on a prepared input
    pub async fn compile_input(&self, input: &CompilerInput) -> Result<CompilerOutput> {
        run_standard_json(self.command(), &self.solc.display().to_string(), input).await
    }

    /// Returns the version reported by `solc --version`
    pub async fn version(&self) -> Result<String> {
        let program = self.solc.display().to_string();
        let output = tokio::process::Command::new(&self.solc)
            .arg("--version")
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .stdout(Stdio::piped())
            .output()
            .await
            .map_err(|err| BackendError::spawn(&program, err))?;
        if !output.status.success() {
            return Err(BackendError::Exit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }
            .into())
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(|l| l.trim_start_matches("Version: ").to_string())
            .ok_or_else(|| crate::error::CompilerError::msg("version not found in solc output"))?;
        Ok(version)
    }
}

impl fmt::Display for NativeSolc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build_command())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::create_dir_all;

    #[test]
    fn builds_command_with_allowed_package_root() {
        let solc = NativeSolc::new("solc", "./test/projects/custom/custom_node_modules").unwrap();
        let command = solc.build_command();
        assert!(command.starts_with("solc --standard-json --allow-paths"));
        assert!(command.ends_with("test/projects/custom/custom_node_modules"));
        assert!(solc.allow_paths.is_absolute());
    }

    #[test]
    fn references_sources_by_absolute_url() {
        let tmp = tempfile::tempdir().unwrap();
        let packages = tmp.path().join("node_modules");
        create_dir_all(packages.join("openzeppelin-solidity")).unwrap();
        let solc = NativeSolc::new("solc", &packages).unwrap();

        let file = tmp.path().join("contracts").join("A.sol");
        let input = solc.build_input(&[file.clone()]).unwrap();
        let key = utils::slash_string(&file);
        assert_eq!(input.sources[&key], Source::url(key.clone()));
        assert_eq!(input.settings.output_selection["*"]["*"], vec!["metadata", "evm.bytecode"]);
        assert_eq!(
            input.settings.remappings[0].to_string(),
            format!("openzeppelin-solidity={}", utils::slash_string(&packages.join("openzeppelin-solidity")))
        );
    }
}
