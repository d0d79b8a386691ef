//! Error types shared by every stage of the conversion.

use std::path::PathBuf;

use thiserror::Error;

pub type EwpResult<T> = Result<T, EwpError>;

#[derive(Debug, Error)]
pub enum EwpError {
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Missing <{element}> in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },

    #[error("No <configuration> elements found in project")]
    NoConfigurations,

    #[error("Invalid value '{value}' for {option} in configuration '{configuration}'")]
    InvalidOption {
        configuration: String,
        option: &'static str,
        value: String,
    },

    #[error("{count} option(s) could not be resolved: {names}")]
    UnresolvedOptions { count: usize, names: String },

    #[error("Failed to launch generator '{program}': {source}")]
    GeneratorLaunch {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Generator '{program}' exited with code {exit_code}")]
    GeneratorFailed {
        program: PathBuf,
        exit_code: i32,
        output: String,
    },
}

impl EwpError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a missing element error
    pub fn missing(element: &'static str, context: impl Into<String>) -> Self {
        Self::MissingElement {
            element,
            context: context.into(),
        }
    }
}
