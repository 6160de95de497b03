//! Error handling for the dockergen application.
//! Defines custom error types and results used throughout the application.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for dockergen operations.
///
/// Every variant is fatal: the run stops at the first error and the process
/// exits with a non-zero status.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Represents errors that occur while walking a source directory
    #[error("Directory walk error: {0}.")]
    WalkError(#[from] walkdir::Error),

    /// A `config.yml` could not be materialised from its sample or could not be parsed
    #[error("Unreadable config '{}': {reason}.", .path.display())]
    ConfigUnreadable { path: PathBuf, reason: String },

    /// A reserved configuration key has an unexpected shape
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// Represents errors that occur during template evaluation
    #[error("Template error: {0}.")]
    TemplateError(String),

    /// A template imports itself, directly or transitively
    #[error("Import cycle detected at '{}' (chain: {}).", .path.display(), display_chain(.chain))]
    ImportCycle { path: PathBuf, chain: Vec<PathBuf> },

    /// A directory declared in `subdirs` does not exist
    #[error("Missing subdirectory '{}'.", .path.display())]
    MissingSubdirectory { path: PathBuf },

    /// The root configuration declares no top-level units
    #[error("No subdirs configured in '{}'.", .path.display())]
    EmptySubdirList { path: PathBuf },

    /// A directory produced no files and declares no subdirs
    #[error("Nothing to generate in '{}'.", .path.display())]
    EmptyDirectory { path: PathBuf },

    /// A staged unit has no build descriptor
    #[error("Missing build descriptor for '{unit}': '{}' does not exist.", .path.display())]
    MissingBuildDescriptor { unit: String, path: PathBuf },

    /// The external container builder exited unsuccessfully
    #[error("Build of '{unit}' failed with status: {status}.")]
    ExternalBuildFailure { unit: String, status: String },

    /// The output root would clobber the source tree
    #[error(
        "Output directory '{}' overlaps source directory '{}'.",
        .output.display(),
        .source_dir.display()
    )]
    OutputOverlapsSource { source_dir: PathBuf, output: PathBuf },

    /// Represents errors in process/ignore glob patterns
    #[error("Pattern error: {0}.")]
    PatternError(String),
}

impl Error {
    /// Converts a minijinja error into a dockergen error.
    ///
    /// Failures raised inside template callbacks (imports, staged copies) travel
    /// through minijinja as error sources; an import cycle found anywhere in
    /// that chain is recovered as [`Error::ImportCycle`]. Everything else is
    /// flattened into a [`Error::TemplateError`] message.
    pub fn from_render(err: minijinja::Error) -> Self {
        let mut messages = vec![err.to_string()];
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            if let Some(Error::ImportCycle { path, chain }) = cause.downcast_ref::<Error>() {
                return Error::ImportCycle { path: path.clone(), chain: chain.clone() };
            }
            messages.push(cause.to_string());
            source = cause.source();
        }
        Error::TemplateError(messages.join(": "))
    }
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Convenience type alias for Results with Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The Error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(1);
}
