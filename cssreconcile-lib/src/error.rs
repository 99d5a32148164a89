use std::fmt;
use std::path::PathBuf;

/// A required input file that was not found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingInput {
    /// Human name of the input, e.g. "Reference stylesheet".
    pub label: String,
    pub path: PathBuf,
    /// What to run to produce the file.
    pub hint: Option<String>,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  - {}: {}", self.label, self.path.display())?;
        if let Some(hint) = &self.hint {
            write!(f, " ({})", hint)?;
        }
        Ok(())
    }
}

fn list_missing(missing: &[MissingInput]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("missing required files:\n{}", list_missing(.0))]
    MissingInputs(Vec<MissingInput>),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}: parse error at line {line}, column {column}: {message} near `{fragment}`")]
    Parse {
        origin: String,
        line: u32,
        column: u32,
        message: String,
        fragment: String,
    },

    #[error("invalid config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("invalid selector pattern `{pattern}`: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
