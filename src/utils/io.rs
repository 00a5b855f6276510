use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::artifact::ModelArtifact;
use crate::model::provider::ModelProvider;

pub fn save_model(path: impl AsRef<Path>, model: &ModelArtifact) -> Result<()> {
    let model_data = bincode::serialize(model).map_err(Error::ModelEncode)?;
    std::fs::write(path, model_data)?;
    Ok(())
}

pub fn load_model(path: impl AsRef<Path>) -> Result<ModelArtifact> {
    let path = path.as_ref();
    let model_data = std::fs::read(path)?;
    let model: ModelArtifact =
        bincode::deserialize(&model_data).map_err(|source| Error::ModelDecode {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        path = %path.display(),
        kind = model.kind(),
        inputs = ?model.n_features(),
        named = model.feature_names().is_some(),
        "model loaded"
    );
    Ok(model)
}
