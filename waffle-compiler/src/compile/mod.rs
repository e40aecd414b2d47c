//! Compiler backends.
//!
//! Every backend turns a list of source files into a [`CompilerInput`], hands it to some
//! `solc` and parses what comes back into a [`CompilerOutput`]. They differ only in how `solc`
//! is executed:
//!
//!   - [`NativeSolc`] spawns a local executable and references sources by absolute path
//!   - [`DockerSolc`] spawns `solc` in the `ethereum/solc` image with the project mounted
//!   - [`LibrarySolc`] calls a compiler library in this process with inlined sources
//!
//! Diagnostics are part of the output. Only failures of the execution environment, like a
//! missing executable or unparsable output, are errors.

use crate::{
    artifacts::CompilerOutput,
    config::{CompilerKind, Config},
    error::{BackendError, Result},
    resolver::ImportCallback,
    utils, CompilerInput,
};
use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

mod docker;
pub use docker::{DockerSolc, CONTAINER_ROOT, DOCKER_IMAGE};

mod library;
pub use library::{LibrarySolc, SolcLibrary};

mod native;
pub use native::NativeSolc;

pub mod output;

/// Selectors requested by the process based backends unless configured otherwise
pub const DEFAULT_PROCESS_SELECTION: [&str; 2] = ["metadata", "evm.bytecode"];

/// Selectors requested by the library backend unless configured otherwise
pub const DEFAULT_LIBRARY_SELECTION: [&str; 3] = ["abi", "evm.bytecode", "evm.deployedBytecode"];

/// One of the supported ways to run the compiler, chosen once from the [`Config`]
#[derive(Debug, Clone)]
pub enum Backend {
    Native(NativeSolc),
    Docker(DockerSolc),
    Library(LibrarySolc),
}

impl Backend {
    /// Creates the backend the config asks for.
    ///
    /// The library backend is created without a library, see [`Backend::with_library`].
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(match config.compiler {
            CompilerKind::Native => Backend::Native(NativeSolc::from_config(config)?),
            CompilerKind::Docker => Backend::Docker(DockerSolc::from_config(config)?),
            CompilerKind::Library => Backend::Library(LibrarySolc::from_config(config)),
        })
    }

    /// An in-process backend that compiles with `library`
    pub fn with_library(library: impl SolcLibrary + 'static) -> Self {
        Backend::Library(LibrarySolc::new(library))
    }

    pub fn kind(&self) -> CompilerKind {
        match self {
            Backend::Native(_) => CompilerKind::Native,
            Backend::Docker(_) => CompilerKind::Docker,
            Backend::Library(_) => CompilerKind::Library,
        }
    }

    /// Builds the standard-json input this backend would send for `files`
    pub fn build_input(&self, files: &[PathBuf]) -> Result<CompilerInput> {
        match self {
            Backend::Native(solc) => solc.build_input(files),
            Backend::Docker(solc) => solc.build_input(files),
            Backend::Library(solc) => solc.build_input(files),
        }
    }

    /// Compiles `files`.
    ///
    /// `imports` is consulted by backends that resolve imports on demand, the process based
    /// backends let `solc` load imports through the remappings instead.
    pub async fn compile(
        &self,
        files: &[PathBuf],
        imports: &dyn ImportCallback,
    ) -> Result<CompilerOutput> {
        match self {
            Backend::Native(solc) => solc.compile(files).await,
            Backend::Docker(solc) => solc.compile(files).await,
            Backend::Library(solc) => solc.compile(files, imports),
        }
    }

    /// Writes one artifact per compiled contract to `target`
    pub async fn save_output(&self, output: &CompilerOutput, target: &Path) -> Result<()> {
        output::write_artifacts(output, target).await
    }

    /// Returns the compiler version, if the backend can tell without compiling
    pub async fn version(&self) -> Option<String> {
        match self {
            Backend::Native(solc) => solc.version().await.ok(),
            Backend::Docker(solc) => Some(solc.tag.clone()),
            Backend::Library(solc) => solc.version(),
        }
    }
}

impl From<NativeSolc> for Backend {
    fn from(solc: NativeSolc) -> Self {
        Backend::Native(solc)
    }
}

impl From<DockerSolc> for Backend {
    fn from(solc: DockerSolc) -> Self {
        Backend::Docker(solc)
    }
}

impl From<LibrarySolc> for Backend {
    fn from(solc: LibrarySolc) -> Self {
        Backend::Library(solc)
    }
}

/// Returns the configured selectors or the given defaults
pub(crate) fn selection(config: &Config, defaults: &[&str]) -> Vec<String> {
    config
        .output_selection
        .clone()
        .unwrap_or_else(|| defaults.iter().map(|s| s.to_string()).collect())
}

/// The key under which a file is passed to the compiler: the path as given, with `/` separators
pub(crate) fn source_key(file: &Path) -> String {
    utils::slash_string(&utils::normalize_path(file))
}

/// Feeds `input` to the spawned `cmd` via stdin and parses its stdout
pub(crate) async fn run_standard_json(
    mut cmd: tokio::process::Command,
    program: &str,
    input: &CompilerInput,
) -> Result<CompilerOutput> {
    use tokio::io::AsyncWriteExt;

    let content = serde_json::to_vec(input)?;
    tracing::trace!("spawning {} with {} sources", program, input.sources.len());
    let mut child = cmd
        .stdin(Stdio::piped())
        .stderr(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|err| BackendError::spawn(program, err))?;

    if let Some(mut stdin) = child.stdin.take() {
        let stdin_err = |io| BackendError::Stdin { program: program.to_string(), io };
        stdin.write_all(&content).await.map_err(stdin_err)?;
        stdin.flush().await.map_err(stdin_err)?;
    }

    let output = child.wait_with_output().await.map_err(|err| BackendError::spawn(program, err))?;
    if !output.status.success() {
        return Err(BackendError::Exit {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
        .into())
    }
    tracing::trace!("{} finished, parsing {} bytes of output", program, output.stdout.len());
    serde_json::from_slice(&output.stdout)
        .map_err(|err| BackendError::malformed(err, &output.stdout).into())
}
