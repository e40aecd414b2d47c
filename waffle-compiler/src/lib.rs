#![doc = include_str!("../README.md")]

pub mod artifacts;
pub use artifacts::{CompilerInput, CompilerOutput, Contract, Diagnostic, Severity};

pub mod compile;
pub use compile::{Backend, DockerSolc, LibrarySolc, NativeSolc, SolcLibrary};

mod config;
pub use config::{CompilerKind, Config, DEFAULT_DOCKER_TAG, SOLC};

pub mod error;
pub mod flatten;
pub use flatten::{flatten_and_save, Flattener};

pub mod remappings;
pub mod report;
pub mod resolver;
pub use resolver::{ImportCallback, ImportResolution, ImportResolver};

pub mod utils;

use error::Result;
use report::{Report, Reporter};
use std::{fmt, path::PathBuf, sync::Arc};

/// Handles contract compiling
#[derive(Debug)]
pub struct Project {
    /// Where to find sources, where to write artifacts
    pub config: Config,
    /// How the compiler is executed
    pub backend: Backend,
    /// Answers import lookups of the compiler
    pub resolver: ImportResolver,
    /// Where diagnostics go
    report: Report,
}

impl Project {
    /// Configure the current project
    ///
    /// # Example
    ///
    /// ```rust
    /// use waffle_compiler::Project;
    /// let project = Project::builder().build().unwrap();
    /// ```
    pub fn builder() -> ProjectBuilder {
        ProjectBuilder::default()
    }

    /// A project using the backend `config` asks for and reporting to stderr
    pub fn from_config(config: Config) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Returns all source files found under the configured sources path
    pub fn sources(&self) -> Result<Vec<PathBuf>> {
        utils::source_files(&self.config.sources_path, &self.config.source_extension)
    }

    /// Compiles all sources and returns the raw output.
    ///
    /// NOTE: this does not check whether the contracts compiled successfully, see
    /// [`CompilerOutput::has_error`] instead.
    pub async fn compile_output(&self) -> Result<CompilerOutput> {
        let files = self.sources()?;
        let version = self.backend.version().await;
        self.report.compile_start(self.backend.kind(), version.as_deref(), &files);
        tracing::debug!("compiling {} files with {}", files.len(), self.backend.kind());
        let output = self.backend.compile(&files, &self.resolver).await?;
        self.report.compile_finished(&output);
        Ok(output)
    }

    /// Compiles all sources and writes artifacts unless the compiler reported an error.
    ///
    /// Diagnostics are reported as is, warnings included. Any diagnostic that is not a warning
    /// fails the build and nothing is written.
    pub async fn compile(&self) -> Result<CompileStatus> {
        let output = self.compile_output().await?;
        if !output.diagnostics().is_empty() {
            self.report.diagnostics(&output.formatted_diagnostics().join("\n"));
        }
        if output.has_error() {
            tracing::debug!("compilation failed, not writing artifacts");
            return Ok(CompileStatus::Failed)
        }
        self.backend.save_output(&output, &self.config.target_path).await?;
        self.report.artifacts_saved(&self.config.target_path);
        Ok(CompileStatus::Success)
    }

    /// A flattener resolving package imports like the compiler does
    pub fn flattener(&self) -> Flattener {
        Flattener::new(self.resolver.clone())
    }
}

pub struct ProjectBuilder {
    /// Where to find sources, where to write artifacts
    config: Option<Config>,
    /// How the compiler is executed
    backend: Option<Backend>,
    /// In-process compiler used instead of the configured backend
    library: Option<Arc<dyn SolcLibrary>>,
    /// Where diagnostics go
    report: Option<Report>,
}

impl ProjectBuilder {
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn backend(mut self, backend: impl Into<Backend>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Compile in process with `library`, unless a backend is set explicitly
    #[must_use]
    pub fn library(mut self, library: impl SolcLibrary + 'static) -> Self {
        self.library = Some(Arc::new(library));
        self
    }

    #[must_use]
    pub fn reporter(mut self, reporter: impl Reporter) -> Self {
        self.report = Some(Report::new(reporter));
        self
    }

    pub fn build(self) -> Result<Project> {
        let Self { config, backend, library, report } = self;
        let config = config.unwrap_or_default();

        let backend = match (backend, library) {
            (Some(backend), _) => backend,
            (None, Some(library)) => LibrarySolc::from_config(&config).library(library).into(),
            (None, None) => Backend::from_config(&config)?,
        };

        Ok(Project {
            resolver: ImportResolver::from_config(&config),
            config,
            backend,
            report: report.unwrap_or_default(),
        })
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self { config: None, backend: None, library: None, report: None }
    }
}

/// The outcome of [`Project::compile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStatus {
    /// No blocking diagnostics, artifacts were written
    Success,
    /// At least one diagnostic was not a warning, nothing was written
    Failed,
}

impl CompileStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileStatus::Success)
    }

    /// The status a process should exit with
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileStatus::Success => 0,
            CompileStatus::Failed => 1,
        }
    }
}

impl fmt::Display for CompileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileStatus::Success => f.write_str("Compilation finished successfully"),
            CompileStatus::Failed => f.write_str("Compilation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(CompileStatus::Success.exit_code(), 0);
        assert_eq!(CompileStatus::Failed.exit_code(), 1);
        assert!(!CompileStatus::Failed.is_success());
    }

    #[test]
    fn library_implies_in_process_backend() {
        struct Empty;
        impl SolcLibrary for Empty {
            fn compile(&self, _: &str, _: &dyn ImportCallback) -> std::result::Result<String, String> {
                Ok("{}".to_string())
            }
        }
        let project = Project::builder().library(Empty).build().unwrap();
        assert_eq!(project.backend.kind(), CompilerKind::Library);
        match &project.backend {
            Backend::Library(solc) => assert!(solc.has_library()),
            backend => panic!("unexpected backend {backend:?}"),
        }
    }

    #[test]
    fn explicit_backend_wins() {
        let docker = DockerSolc::new(".", "node_modules").unwrap().tag("0.4.24");
        let project = Project::builder().backend(docker).build().unwrap();
        assert_eq!(project.backend.kind(), CompilerKind::Docker);
        assert_eq!(project.resolver.package_root(), std::path::Path::new("./node_modules"));
    }

    #[test]
    fn resolver_follows_project_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("contracts")).unwrap();
        std::fs::write(tmp.path().join("contracts/A.sol"), "contract A {}").unwrap();

        let config = Config::default().root(tmp.path());
        let backend = LibrarySolc::from_config(&config);
        let project = Project::builder().config(config).backend(backend).build().unwrap();
        assert_eq!(project.resolver.resolve("contracts/A.sol").contents(), Some("contract A {}"));
    }
}
