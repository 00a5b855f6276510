use ndarray::Array2;
use thiserror::Error;

/// Failure raised by a model while computing predictions.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// A pre-trained regression model treated as a black box.
///
/// `predict` receives one feature row per matrix row and returns one
/// estimate per row, in row order. The two introspection methods are
/// optional capabilities: a model that knows the column names or input width
/// it was trained on reports them, and callers must honour them exactly.
pub trait ModelProvider {
    fn predict(&self, rows: &Array2<f64>) -> Result<Vec<f64>, ModelError>;

    /// Ordered input column names, when the model records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Expected number of input columns, when the model records it.
    fn n_features(&self) -> Option<usize> {
        None
    }
}

impl<M: ModelProvider + ?Sized> ModelProvider for &M {
    fn predict(&self, rows: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        (**self).predict(rows)
    }

    fn feature_names(&self) -> Option<&[String]> {
        (**self).feature_names()
    }

    fn n_features(&self) -> Option<usize> {
        (**self).n_features()
    }
}

impl<M: ModelProvider + ?Sized> ModelProvider for Box<M> {
    fn predict(&self, rows: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        (**self).predict(rows)
    }

    fn feature_names(&self) -> Option<&[String]> {
        (**self).feature_names()
    }

    fn n_features(&self) -> Option<usize> {
        (**self).n_features()
    }
}
