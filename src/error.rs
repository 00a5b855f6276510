//! Error types.
//!
//! [`PredictionError`] is the per-request taxonomy: every failure of a
//! predict action is one of its three variants and none of them is fatal to
//! the session. [`Error`] covers loading the dataset and model at session
//! start.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for session-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while loading or exporting session data.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("model file {} could not be decoded: {source}", .path.display())]
    ModelDecode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("model could not be encoded: {0}")]
    ModelEncode(#[source] bincode::Error),

    #[error("dataset is missing required column `{0}`")]
    MissingColumn(String),

    #[error("dataset contains no observations")]
    EmptyDataset,

    #[error("nothing to plot: {0}")]
    EmptySeries(String),

    #[error("plotting failed: {0}")]
    Plot(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Classified failure of a single prediction request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    /// A user-supplied value could not be coerced to the required type.
    #[error("invalid input for `{field}` ({value:?}): {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// The feature row disagrees with what the model expects.
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    /// The model itself failed while predicting.
    #[error("model failed during prediction: {message}")]
    ModelInvocation { message: String },
}

impl PredictionError {
    pub(crate) fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        PredictionError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::InvalidInput { .. } => "InvalidInput",
            PredictionError::SchemaMismatch(_) => "SchemaMismatch",
            PredictionError::ModelInvocation { .. } => "ModelInvocationError",
        }
    }
}

/// Expected versus actual feature columns.
///
/// `expected` is empty when the model only reports its input width.
/// `unresolved` lists expected columns that could not be produced at all;
/// it is empty when the mismatch is one of order or count only.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMismatch {
    pub expected: Vec<String>,
    pub expected_count: usize,
    pub actual: Vec<String>,
    pub unresolved: Vec<String>,
}

impl SchemaMismatch {
    pub fn new(expected: Vec<String>, actual: Vec<String>) -> Self {
        let unresolved = expected
            .iter()
            .filter(|name| !actual.contains(name))
            .cloned()
            .collect();
        SchemaMismatch {
            expected_count: expected.len(),
            expected,
            actual,
            unresolved,
        }
    }

    /// Mismatch against a model that exposes a width but no column names.
    pub fn width(expected_count: usize, actual: Vec<String>) -> Self {
        SchemaMismatch {
            expected: Vec::new(),
            expected_count,
            actual,
            unresolved: Vec::new(),
        }
    }
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature schema mismatch: model expects {} columns", self.expected_count)?;
        if !self.expected.is_empty() {
            write!(f, " [{}]", self.expected.join(", "))?;
        }
        write!(
            f,
            ", got {} columns [{}]",
            self.actual.len(),
            self.actual.join(", ")
        )?;
        if !self.unresolved.is_empty() {
            write!(f, "; unresolvable: [{}]", self.unresolved.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaMismatch {}
