use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    InvalidRecordId(String),
    InvalidCoordinate(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidRecordId(msg) => {
                write!(f, "invalid record id: {msg}")
            }
            ModelError::InvalidCoordinate(msg) => {
                write!(f, "invalid coordinate: {msg}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
