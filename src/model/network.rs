use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::preprocessing::DataStats;
use crate::model::layers::relu;
use crate::model::provider::{ModelError, ModelProvider};

/// Feed-forward regression network with three ReLU hidden layers and a
/// single linear output unit.
///
/// Inputs are standardized with `stats` before the forward pass when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpRegressor {
    pub weights1: Array2<f64>,
    pub bias1: Array2<f64>,
    pub weights2: Array2<f64>,
    pub bias2: Array2<f64>,
    pub weights3: Array2<f64>,
    pub bias3: Array2<f64>,
    pub weights4: Array2<f64>,
    pub bias4: Array2<f64>,
    pub stats: Option<DataStats>,
    pub feature_names: Option<Vec<String>>,
}

impl MlpRegressor {
    /// Assemble a network from trained layer parameters.
    ///
    /// `layers` holds `(weights, bias)` for the three hidden layers and the
    /// output layer, in order.
    pub fn from_layers(
        layers: [(Array2<f64>, Array2<f64>); 4],
        stats: Option<DataStats>,
    ) -> Result<Self, ModelError> {
        let [(weights1, bias1), (weights2, bias2), (weights3, bias3), (weights4, bias4)] = layers;
        let network = MlpRegressor {
            weights1,
            bias1,
            weights2,
            bias2,
            weights3,
            bias3,
            weights4,
            bias4,
            stats,
            feature_names: None,
        };
        network.validate()?;
        Ok(network)
    }

    pub fn with_feature_names<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Result<Self, ModelError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() != self.input_size() {
            return Err(ModelError(format!(
                "{} feature names for a network with {} inputs",
                names.len(),
                self.input_size()
            )));
        }
        self.feature_names = Some(names);
        Ok(self)
    }

    pub fn input_size(&self) -> usize {
        self.weights1.nrows()
    }

    /// Check that consecutive layers line up and the output is one unit wide.
    pub fn validate(&self) -> Result<(), ModelError> {
        let layers = [
            ("layer 1", &self.weights1, &self.bias1),
            ("layer 2", &self.weights2, &self.bias2),
            ("layer 3", &self.weights3, &self.bias3),
            ("output layer", &self.weights4, &self.bias4),
        ];
        for window in layers.windows(2) {
            let (name, weights, _) = window[0];
            let (next, next_weights, _) = window[1];
            if weights.ncols() != next_weights.nrows() {
                return Err(ModelError(format!(
                    "{name} produces {} values but {next} takes {}",
                    weights.ncols(),
                    next_weights.nrows()
                )));
            }
        }
        for (name, weights, bias) in layers {
            if bias.dim() != (1, weights.ncols()) {
                return Err(ModelError(format!(
                    "{name} bias has shape {:?}, expected (1, {})",
                    bias.dim(),
                    weights.ncols()
                )));
            }
        }
        if self.weights4.ncols() != 1 {
            return Err(ModelError(format!(
                "output layer has {} units, expected 1",
                self.weights4.ncols()
            )));
        }
        if let Some(stats) = &self.stats {
            if stats.width() != self.input_size() || stats.std.len() != self.input_size() {
                return Err(ModelError(format!(
                    "normalization stats cover {} features, network takes {}",
                    stats.width(),
                    self.input_size()
                )));
            }
        }
        Ok(())
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        let hidden_output1 = relu(&(x.dot(&self.weights1) + &self.bias1));
        let hidden_output2 = relu(&(hidden_output1.dot(&self.weights2) + &self.bias2));
        let hidden_output3 = relu(&(hidden_output2.dot(&self.weights3) + &self.bias3));
        hidden_output3.dot(&self.weights4) + &self.bias4
    }
}

impl ModelProvider for MlpRegressor {
    fn predict(&self, rows: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        self.validate()?;
        if rows.ncols() != self.input_size() {
            return Err(ModelError(format!(
                "input has {} features, network expects {}",
                rows.ncols(),
                self.input_size()
            )));
        }

        let output = match &self.stats {
            Some(stats) => self.forward(&stats.standardize(rows)),
            None => self.forward(rows),
        };

        let predictions = output.column(0).to_vec();
        if let Some(row) = predictions.iter().position(|v| !v.is_finite()) {
            return Err(ModelError(format!("non-finite output for row {row}")));
        }
        Ok(predictions)
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.input_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};

    /// 2 inputs → hidden widths 2, 2, 1 → 1 output; computes relu(a) + relu(b) + 1.
    fn tiny_network() -> MlpRegressor {
        MlpRegressor::from_layers(
            [
                (array![[1.0, 0.0], [0.0, 1.0]], array![[0.0, 0.0]]),
                (array![[1.0, 0.0], [0.0, 1.0]], array![[0.0, 0.0]]),
                (array![[1.0], [1.0]], array![[0.0]]),
                (array![[1.0]], array![[1.0]]),
            ],
            None,
        )
        .unwrap()
    }

    #[test]
    fn forward_pass_is_linear_output_of_relu_layers() {
        let out = tiny_network().predict(&array![[2.0, 3.0], [-1.0, 4.0]]).unwrap();
        assert_eq!(out, vec![6.0, 5.0]);
    }

    #[test]
    fn stats_standardize_inputs() {
        let stats = DataStats {
            mean: Array1::from(vec![1.0, 1.0]),
            std: Array1::from(vec![2.0, 0.0]),
        };
        let mut net = tiny_network();
        net.stats = Some(stats);
        // (5 - 1) / 2 = 2, (3 - 1) / 1 = 2 (zero std only centers)
        assert_eq!(net.predict(&array![[5.0, 3.0]]).unwrap(), vec![5.0]);
    }

    #[test]
    fn mismatched_layers_are_rejected() {
        let err = MlpRegressor::from_layers(
            [
                (array![[1.0, 0.0], [0.0, 1.0]], array![[0.0, 0.0]]),
                (array![[1.0], [0.0], [1.0]], array![[0.0]]),
                (array![[1.0]], array![[0.0]]),
                (array![[1.0]], array![[0.0]]),
            ],
            None,
        )
        .unwrap_err();
        assert!(err.0.contains("layer 1 produces 2 values but layer 2 takes 3"));
    }

    #[test]
    fn wrong_input_width_is_an_error_not_a_panic() {
        let err = tiny_network().predict(&array![[1.0, 2.0, 3.0]]).unwrap_err();
        assert!(err.0.contains("expects 2"));
    }

    #[test]
    fn non_finite_output_is_reported() {
        let mut net = tiny_network();
        net.bias4 = array![[f64::INFINITY]];
        let err = net.predict(&array![[1.0, 1.0]]).unwrap_err();
        assert!(err.0.contains("non-finite output for row 0"));
    }
}
