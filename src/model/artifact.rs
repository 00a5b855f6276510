use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::model::linear::LinearRegressor;
use crate::model::network::MlpRegressor;
use crate::model::provider::{ModelError, ModelProvider};

/// A serialized, pre-trained PM2.5 regressor as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelArtifact {
    Linear(LinearRegressor),
    Network(MlpRegressor),
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Linear(_) => "linear",
            ModelArtifact::Network(_) => "network",
        }
    }

    fn inner(&self) -> &dyn ModelProvider {
        match self {
            ModelArtifact::Linear(model) => model,
            ModelArtifact::Network(model) => model,
        }
    }
}

impl ModelProvider for ModelArtifact {
    fn predict(&self, rows: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        self.inner().predict(rows)
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.inner().feature_names()
    }

    fn n_features(&self) -> Option<usize> {
        self.inner().n_features()
    }
}

impl From<LinearRegressor> for ModelArtifact {
    fn from(model: LinearRegressor) -> Self {
        ModelArtifact::Linear(model)
    }
}

impl From<MlpRegressor> for ModelArtifact {
    fn from(model: MlpRegressor) -> Self {
        ModelArtifact::Network(model)
    }
}
