//! Error types for the demo-block compiler

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SFC error in {file} at line {line}: {message}")]
    Sfc { file: String, line: usize, message: String },

    #[error("Compile error in component {id}: {message}")]
    Compile { id: String, message: String },

    #[error("Unknown demo component: {id} was never registered")]
    UnknownComponent { id: String },

    #[error("Watch error: {message}")]
    Watch { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, CompilerError>;

impl CompilerError {
    pub fn sfc(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Sfc {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn compile(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compile {
            id: id.into(),
            message: message.into(),
        }
    }

    pub fn unknown_component(id: impl Into<String>) -> Self {
        Self::UnknownComponent { id: id.into() }
    }

    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
        }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}
