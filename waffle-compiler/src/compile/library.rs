use super::{selection, source_key, DEFAULT_LIBRARY_SELECTION};
use crate::{
    artifacts::{CompilerInput, CompilerOutput, Source},
    config::Config,
    error::{BackendError, CompilerError, Result},
    resolver::ImportCallback,
};
use std::{collections::BTreeMap, fmt, fs, path::PathBuf, sync::Arc};

/// A solidity compiler that runs inside this process.
///
/// It takes a serialized standard-json input and returns the serialized output. Imports that are
/// not part of the input are requested through `imports` while compiling.
pub trait SolcLibrary: Send + Sync {
    fn compile(&self, input: &str, imports: &dyn ImportCallback) -> std::result::Result<String, String>;

    /// The version of the loaded compiler, if known
    fn version(&self) -> Option<String> {
        None
    }
}

/// Compiles with an in-process [`SolcLibrary`], sources are inlined into the input
#[derive(Clone)]
pub struct LibrarySolc {
    library: Option<Arc<dyn SolcLibrary>>,
    /// Selectors requested for every contract
    pub output_selection: Vec<String>,
}

impl LibrarySolc {
    pub fn new(library: impl SolcLibrary + 'static) -> Self {
        Self { library: Some(Arc::new(library)), output_selection: default_selection() }
    }

    /// A backend without a library, compiling with it fails with
    /// [`BackendError::LibraryUnavailable`] until one is set
    pub fn from_config(config: &Config) -> Self {
        Self { library: None, output_selection: selection(config, &DEFAULT_LIBRARY_SELECTION) }
    }

    /// Sets the compiler library
    #[must_use]
    pub fn library(mut self, library: Arc<dyn SolcLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    pub fn has_library(&self) -> bool {
        self.library.is_some()
    }

    /// Builds the standard-json input with the content of every file inlined
    pub fn build_input(&self, files: &[PathBuf]) -> Result<CompilerInput> {
        let mut sources = BTreeMap::new();
        for file in files {
            let content = fs::read_to_string(file).map_err(|err| CompilerError::io(err, file))?;
            sources.insert(source_key(file), Source::content(content));
        }
        Ok(CompilerInput::new(sources, Vec::new(), self.output_selection.iter().cloned()))
    }

    /// Compiles `files`, resolving imports through `imports`
    pub fn compile(&self, files: &[PathBuf], imports: &dyn ImportCallback) -> Result<CompilerOutput> {
        let input = self.build_input(files)?;
        self.compile_input(&input, imports)
    }

    pub fn compile_input(&self, input: &CompilerInput, imports: &dyn ImportCallback) -> Result<CompilerOutput> {
        let library = self.library.as_ref().ok_or(BackendError::LibraryUnavailable)?;
        let input = serde_json::to_string(input)?;
        let output = library.compile(&input, imports).map_err(BackendError::Library)?;
        serde_json::from_str(&output).map_err(|err| BackendError::malformed(err, &output).into())
    }

    pub fn version(&self) -> Option<String> {
        self.library.as_ref()?.version()
    }
}

impl fmt::Debug for LibrarySolc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibrarySolc")
            .field("library", &self.library.as_ref().map(|_| "<solc library>"))
            .field("output_selection", &self.output_selection)
            .finish()
    }
}

fn default_selection() -> Vec<String> {
    DEFAULT_LIBRARY_SELECTION.iter().map(|s| s.to_string()).collect()
}
