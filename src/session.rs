//! One user session: the dataset and model loaded once, the schema
//! discovered once, and request handling on top of them.

use tracing::info;

use crate::config::Config;
use crate::data::dataset::{Dataset, DatasetProvider};
use crate::error::{PredictionError, Result};
use crate::features::assembler::FeatureAssembler;
use crate::features::row::{FeatureRow, RawInputs};
use crate::features::schema::FeatureSchema;
use crate::model::artifact::ModelArtifact;
use crate::model::invoker::{Prediction, PredictionInvoker};
use crate::model::provider::ModelProvider;
use crate::utils::io::load_model;

/// Read-only state shared by every request of a session.
pub struct Session<M: ModelProvider = ModelArtifact> {
    dataset: Dataset,
    model: M,
    schema: FeatureSchema,
}

impl Session<ModelArtifact> {
    /// Load the dataset and model named by `config`.
    pub fn open(config: &Config) -> Result<Self> {
        let dataset = Dataset::from_path(&config.dataset_path)?;
        let model = load_model(&config.model_path)?;
        Ok(Session::new(dataset, model, &config.fallback_columns))
    }
}

impl<M: ModelProvider> Session<M> {
    pub fn new(dataset: Dataset, model: M, fallback_columns: &[String]) -> Self {
        let schema = FeatureSchema::discover(&model, &dataset, fallback_columns);
        info!(
            cities = dataset.cities().len(),
            features = schema.expected_columns().len(),
            "session ready"
        );
        Session {
            dataset,
            model,
            schema,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn assembler(&self) -> FeatureAssembler<'_, Dataset> {
        FeatureAssembler::new(&self.dataset, &self.schema)
    }

    pub fn invoker(&self) -> PredictionInvoker<'_, M> {
        PredictionInvoker::new(&self.model)
    }

    /// Assemble and predict a single row.
    pub fn predict(&self, raw: &RawInputs) -> std::result::Result<(FeatureRow, Prediction), PredictionError> {
        let row = self.assembler().assemble(raw)?;
        let prediction = self.invoker().predict(&row)?;
        Ok((row, prediction))
    }

    /// Predict the same inputs for each city in one batch, in the given order.
    pub fn predict_for_cities<S: AsRef<str>>(
        &self,
        raw: &RawInputs,
        cities: &[S],
    ) -> std::result::Result<Vec<(String, Prediction)>, PredictionError> {
        let rows = self.assembler().assemble_for_cities(raw, cities)?;
        let predictions = self.invoker().predict_batch(&rows)?;
        Ok(cities
            .iter()
            .map(|city| city.as_ref().to_string())
            .zip(predictions)
            .collect())
    }
}
