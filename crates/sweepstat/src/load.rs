//! Results-file loading
//!
//! A results file is either a bare JSON array of run records or an object
//! wrapping them as `{"results": [...], "metadata": {...}}`.

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Schema errors raised while reading a results file
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unrecognised results schema in {}: expected an array or an object with a `results` array", .0.display())]
    UnrecognizedShape(PathBuf),

    #[error("no runs found in {}", .0.display())]
    Empty(PathBuf),
}

/// Run records plus the optional run metadata
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedResults {
    pub results: Vec<Value>,
    pub metadata: Option<Value>,
}

impl LoadedResults {
    /// Run name recorded in the metadata, if any
    pub fn run_name(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("name")?.as_str()
    }
}

/// Split a parsed document into run records and metadata.
pub fn parse_results(payload: Value, path: &Path) -> Result<LoadedResults, LoadError> {
    let loaded = match payload {
        Value::Array(results) => LoadedResults {
            results,
            metadata: None,
        },
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(results)) => LoadedResults {
                results,
                metadata: map.remove("metadata").filter(Value::is_object),
            },
            _ => return Err(LoadError::UnrecognizedShape(path.to_path_buf())),
        },
        _ => return Err(LoadError::UnrecognizedShape(path.to_path_buf())),
    };
    if loaded.results.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    Ok(loaded)
}

/// Read and parse the results file at `path`.
pub fn load_results(path: &Path) -> Result<LoadedResults, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let payload: Value = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = parse_results(payload, path)?;
    tracing::info!(runs = loaded.results.len(), path = %path.display(), "loaded results");
    Ok(loaded)
}
