//! Air-quality exploration and PM2.5 prediction.
//!
//! A session loads a city/day pollutant dataset and a pre-trained regression
//! model once. Each prediction request turns the user's partial inputs into a
//! feature row shaped exactly as the model expects ([`features`]) and submits
//! it to the model ([`model::invoker`]). Failures are classified as
//! [`PredictionError`] variants and never end the session.

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod model;
pub mod session;
pub mod utils;

pub use config::Config;
pub use data::dataset::{Dataset, DatasetProvider, Observation};
pub use error::{Error, PredictionError, SchemaMismatch};
pub use features::assembler::FeatureAssembler;
pub use features::row::{FeatureRow, RawInputs, RawValue, ValueSource};
pub use features::schema::{FeatureSchema, SchemaSource};
pub use model::artifact::ModelArtifact;
pub use model::invoker::{PendingPrediction, Prediction, PredictionInvoker, PredictionOutcome};
pub use model::provider::{ModelError, ModelProvider};
pub use session::Session;
