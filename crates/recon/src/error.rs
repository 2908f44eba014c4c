use std::fmt;

use crate::model::Identifier;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing catalog, bad combine reference, etc.).
    ConfigValidation(String),
    /// A referenced catalog has no loaded data.
    UnknownCatalog(String),
    /// Missing required column in input data.
    MissingColumn { catalog: String, column: String },
    /// Override file parse error.
    OverrideParse(String),
    /// Duplicate canonical key reached the registry builder. This is an
    /// upstream logic defect, not a data issue, and aborts the run.
    DuplicateKey(Identifier),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownCatalog(name) => write!(f, "unknown catalog: {name}"),
            Self::MissingColumn { catalog, column } => {
                write!(f, "catalog '{catalog}': missing column '{column}'")
            }
            Self::OverrideParse(msg) => write!(f, "override parse error: {msg}"),
            Self::DuplicateKey(key) => {
                write!(f, "duplicate canonical key '{key}' in final population")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
