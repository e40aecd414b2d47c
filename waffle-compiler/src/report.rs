//! Subscribe to events in the compiler pipeline
//!
//! The diagnostics channel of a [`crate::Project`] is a [`Reporter`]. Compiler diagnostics are
//! always handed to it as text, warnings included, before the project decides whether the
//! build failed.

use crate::{artifacts::CompilerOutput, config::CompilerKind};
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Trait representing the functions required to emit information about various steps in the
/// compiler pipeline.
///
/// This trait provides a series of callbacks that are invoked at certain parts of the
/// [`crate::Project::compile()`] process.
///
/// A `Reporter` is entirely passive and only listens to incoming "events".
pub trait Reporter: Send + Sync + 'static {
    /// Callback invoked right before the backend is asked to compile `files`
    fn on_compile_start(&self, _kind: CompilerKind, _version: Option<&str>, _files: &[PathBuf]) {}

    /// Invoked with the output of every compiler run that produced one
    fn on_compile_finished(&self, _output: &CompilerOutput) {}

    /// Invoked with the formatted messages of all diagnostics, one per line
    fn on_diagnostics(&self, _diagnostics: &str) {}

    /// Invoked after all artifacts were written to `target`
    fn on_artifacts_saved(&self, _target: &Path) {}
}

impl<T: Reporter + ?Sized> Reporter for Arc<T> {
    fn on_compile_start(&self, kind: CompilerKind, version: Option<&str>, files: &[PathBuf]) {
        (**self).on_compile_start(kind, version, files)
    }

    fn on_compile_finished(&self, output: &CompilerOutput) {
        (**self).on_compile_finished(output)
    }

    fn on_diagnostics(&self, diagnostics: &str) {
        (**self).on_diagnostics(diagnostics)
    }

    fn on_artifacts_saved(&self, target: &Path) {
        (**self).on_artifacts_saved(target)
    }
}

/// A no-op [`Reporter`] that does nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoReporter(());

impl Reporter for NoReporter {}

/// A [`Reporter`] that writes diagnostics to `stderr` and progress to `stdout`
#[derive(Copy, Clone, Debug, Default)]
pub struct BasicStderrReporter(());

impl Reporter for BasicStderrReporter {
    fn on_compile_start(&self, kind: CompilerKind, version: Option<&str>, files: &[PathBuf]) {
        match version {
            Some(version) => println!("Compiling {} files with {kind} {version}", files.len()),
            None => println!("Compiling {} files with {kind}", files.len()),
        }
    }

    fn on_diagnostics(&self, diagnostics: &str) {
        eprintln!("{diagnostics}");
    }

    fn on_artifacts_saved(&self, target: &Path) {
        println!("Compilation finished, artifacts written to {}", target.display());
    }
}

/// A shared, type-erased reporter
#[derive(Clone)]
pub struct Report {
    reporter: Arc<dyn Reporter>,
}

impl Report {
    pub fn new(reporter: impl Reporter) -> Self {
        Self { reporter: Arc::new(reporter) }
    }

    pub(crate) fn compile_start(&self, kind: CompilerKind, version: Option<&str>, files: &[PathBuf]) {
        self.reporter.on_compile_start(kind, version, files)
    }

    pub(crate) fn compile_finished(&self, output: &CompilerOutput) {
        self.reporter.on_compile_finished(output)
    }

    pub(crate) fn diagnostics(&self, diagnostics: &str) {
        self.reporter.on_diagnostics(diagnostics)
    }

    pub(crate) fn artifacts_saved(&self, target: &Path) {
        self.reporter.on_artifacts_saved(target)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new(BasicStderrReporter::default())
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Report(..)")
    }
}

impl<T: Reporter> From<T> for Report {
    fn from(reporter: T) -> Self {
        Report::new(reporter)
    }
}
