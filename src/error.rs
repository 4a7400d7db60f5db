use std::{io, path::StripPrefixError};

use serde::{Deserialize, Serialize};
use serde_yaml::Error as YamlError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum RefileError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("Planning error: {0}")]
    Plan(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Write failed: {0}")]
    Write(String),
}

impl From<io::Error> for RefileError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => RefileError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => RefileError::PermissionDenied,
            _ => RefileError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<StripPrefixError> for RefileError {
    fn from(src: StripPrefixError) -> RefileError {
        RefileError::NotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<YamlError> for RefileError {
    fn from(src: YamlError) -> RefileError {
        RefileError::Parse(format!("Yaml deserialization error: {src}"))
    }
}

impl From<toml::de::Error> for RefileError {
    fn from(src: toml::de::Error) -> RefileError {
        RefileError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for RefileError {
    fn from(src: toml::ser::Error) -> RefileError {
        RefileError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<tempfile::PersistError> for RefileError {
    fn from(src: tempfile::PersistError) -> RefileError {
        RefileError::Write(format!("Atomic replace failed: {}", src.error))
    }
}
