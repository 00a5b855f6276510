use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::model::provider::{ModelError, ModelProvider};

/// Ordinary linear regression: `y = x · coefficients + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
    pub feature_names: Option<Vec<String>>,
}

impl LinearRegressor {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        LinearRegressor {
            coefficients: Array1::from(coefficients),
            intercept,
            feature_names: None,
        }
    }

    /// Attach the training-time column names, one per coefficient.
    pub fn with_feature_names<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<Self, ModelError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() != self.coefficients.len() {
            return Err(ModelError(format!(
                "{} feature names for {} coefficients",
                names.len(),
                self.coefficients.len()
            )));
        }
        self.feature_names = Some(names);
        Ok(self)
    }
}

impl ModelProvider for LinearRegressor {
    fn predict(&self, rows: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        if rows.ncols() != self.coefficients.len() {
            return Err(ModelError(format!(
                "X has {} features, but LinearRegressor is expecting {} features as input",
                rows.ncols(),
                self.coefficients.len()
            )));
        }
        let output = rows.dot(&self.coefficients) + self.intercept;
        Ok(output.to_vec())
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn predicts_one_value_per_row() {
        let model = LinearRegressor::new(vec![0.5, 2.0], 1.0);
        let out = model.predict(&array![[10.0, 1.0], [0.0, 0.0]]).unwrap();
        assert_eq!(out, vec![8.0, 1.0]);
    }

    #[test]
    fn wrong_width_is_a_model_error() {
        let model = LinearRegressor::new(vec![1.0, 1.0], 0.0);
        let err = model.predict(&array![[1.0, 2.0, 3.0]]).unwrap_err();
        assert!(err.0.contains("expecting 2 features"));
    }

    #[test]
    fn feature_names_must_match_coefficients() {
        assert!(LinearRegressor::new(vec![1.0], 0.0).with_feature_names(["A", "B"]).is_err());
        let model = LinearRegressor::new(vec![1.0, 2.0], 0.0)
            .with_feature_names(["PM10", "NO2"])
            .unwrap();
        assert_eq!(model.feature_names().unwrap(), ["PM10", "NO2"]);
        assert_eq!(model.n_features(), Some(2));
    }
}
