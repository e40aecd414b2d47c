use std::{io, path::PathBuf, process::ExitStatus};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompilerError>;

/// Various error types
#[derive(Debug, Error)]
pub enum CompilerError {
    /// A directory that must exist, like the sources root, is missing
    #[error("No such directory: \"{}\"", .0.display())]
    NotFound(PathBuf),
    /// The compiler backend could not produce an output document
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// An import could neither be found in the project nor in the package root
    #[error("Failed to resolve import \"{import}\" in \"{}\": {reason}", .file.display())]
    UnresolvedImport { import: String, file: PathBuf, reason: String },
    /// Deserialization error
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// Filesystem IO error
    #[error(transparent)]
    Io(#[from] CompilerIoError),
    /// General purpose message
    #[error("{0}")]
    Message(String),
}

impl CompilerError {
    pub(crate) fn io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        CompilerIoError::new(err, path).into()
    }

    pub(crate) fn msg(msg: impl Into<String>) -> Self {
        CompilerError::Message(msg.into())
    }
}

/// Failures of the environment a backend runs in.
///
/// Compiler diagnostics are never reported through this type, they are part of the
/// [`crate::CompilerOutput`].
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to spawn \"{program}\": {io}")]
    Spawn { program: String, io: io::Error },
    #[error("Failed to write the compiler input to \"{program}\": {io}")]
    Stdin { program: String, io: io::Error },
    #[error("Compiler exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },
    #[error("Malformed compiler output: {err}. Output: {text}")]
    MalformedOutput { err: serde_json::Error, text: String },
    #[error("Compiler library failed: {0}")]
    Library(String),
    #[error("No in-process compiler library was configured")]
    LibraryUnavailable,
}

impl BackendError {
    pub(crate) fn spawn(program: impl Into<String>, io: io::Error) -> Self {
        BackendError::Spawn { program: program.into(), io }
    }

    pub(crate) fn malformed(err: serde_json::Error, text: impl AsRef<[u8]>) -> Self {
        BackendError::MalformedOutput {
            err,
            text: String::from_utf8_lossy(text.as_ref()).to_string(),
        }
    }
}

#[derive(Debug, Error)]
#[error("\"{}\": {io}", self.path.display())]
pub struct CompilerIoError {
    io: io::Error,
    path: PathBuf,
}

impl CompilerIoError {
    pub fn new(io: io::Error, path: impl Into<PathBuf>) -> Self {
        Self { io, path: path.into() }
    }

    /// The path at which the error occurred
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// The underlying `io::Error`
    pub fn io_error(&self) -> &io::Error {
        &self.io
    }
}

impl From<CompilerIoError> for io::Error {
    fn from(err: CompilerIoError) -> Self {
        err.io
    }
}
