//! Calls the model once per request and classifies the outcome.

use std::fmt;
use std::slice;
use tracing::{debug, warn};

use crate::error::{PredictionError, SchemaMismatch};
use crate::features::row::{FeatureRow, to_matrix};
use crate::model::provider::ModelProvider;

/// A PM2.5 estimate in µg/m³, exactly as the model returned it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub value: f64,
}

impl Prediction {
    /// The value rounded to two decimals, for display.
    pub fn rounded(&self) -> f64 {
        (self.value * 100.0).round() / 100.0
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} µg/m³", self.rounded())
    }
}

/// Resolved state of a prediction request.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Succeeded(Prediction),
    Failed(PredictionError),
}

impl PredictionOutcome {
    pub fn into_result(self) -> Result<Prediction, PredictionError> {
        match self {
            PredictionOutcome::Succeeded(prediction) => Ok(prediction),
            PredictionOutcome::Failed(err) => Err(err),
        }
    }
}

impl From<Result<Prediction, PredictionError>> for PredictionOutcome {
    fn from(result: Result<Prediction, PredictionError>) -> Self {
        match result {
            Ok(prediction) => PredictionOutcome::Succeeded(prediction),
            Err(err) => PredictionOutcome::Failed(err),
        }
    }
}

impl fmt::Display for PredictionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionOutcome::Succeeded(prediction) => write!(f, "PM2.5: {prediction}"),
            PredictionOutcome::Failed(err) => write!(f, "{}: {err}", err.kind()),
        }
    }
}

/// An assembled row that has not been submitted yet.
///
/// Resolving consumes the request, so each one reaches the model at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPrediction {
    row: FeatureRow,
}

impl PendingPrediction {
    pub fn new(row: FeatureRow) -> Self {
        PendingPrediction { row }
    }

    pub fn row(&self) -> &FeatureRow {
        &self.row
    }

    pub fn resolve<M: ModelProvider + ?Sized>(
        self,
        invoker: &PredictionInvoker<'_, M>,
    ) -> PredictionOutcome {
        invoker.predict(&self.row).into()
    }
}

/// Submits feature rows to a model.
pub struct PredictionInvoker<'m, M: ModelProvider + ?Sized> {
    model: &'m M,
}

impl<'m, M: ModelProvider + ?Sized> PredictionInvoker<'m, M> {
    pub fn new(model: &'m M) -> Self {
        PredictionInvoker { model }
    }

    pub fn predict(&self, row: &FeatureRow) -> Result<Prediction, PredictionError> {
        self.predict_batch(slice::from_ref(row))?
            .into_iter()
            .next()
            .ok_or_else(|| PredictionError::ModelInvocation {
                message: "model returned no prediction".to_string(),
            })
    }

    /// Predict every row in one model call; results keep input order.
    pub fn predict_batch(&self, rows: &[FeatureRow]) -> Result<Vec<Prediction>, PredictionError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let layout = rows[0].columns();
        for row in rows {
            if row.columns() != layout {
                return Err(SchemaMismatch::new(layout.to_vec(), row.columns().to_vec()).into());
            }
            self.check_schema(row)?;
        }

        let matrix = to_matrix(rows);
        debug!(rows = matrix.nrows(), cols = matrix.ncols(), "invoking model");
        let values = self.model.predict(&matrix).map_err(|err| {
            warn!(error = %err, "model failed during prediction");
            PredictionError::ModelInvocation { message: err.0 }
        })?;

        if values.len() != rows.len() {
            return Err(PredictionError::ModelInvocation {
                message: format!(
                    "model returned {} predictions for {} rows",
                    values.len(),
                    rows.len()
                ),
            });
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            warn!(row = idx, value = values[idx], "model returned a non-finite prediction");
            return Err(PredictionError::ModelInvocation {
                message: format!("model returned {} for row {idx}", values[idx]),
            });
        }
        Ok(values.into_iter().map(|value| Prediction { value }).collect())
    }

    fn check_schema(&self, row: &FeatureRow) -> Result<(), SchemaMismatch> {
        if let Some(names) = self.model.feature_names() {
            if row.columns() != names {
                return Err(SchemaMismatch::new(names.to_vec(), row.columns().to_vec()));
            }
        }
        if let Some(width) = self.model.n_features() {
            if row.len() != width {
                return Err(SchemaMismatch::width(width, row.columns().to_vec()));
            }
        }
        Ok(())
    }
}
