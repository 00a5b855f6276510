//! The column layout a model expects, discovered once per session.

use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use crate::data::dataset::{CALENDAR_COLUMNS, CITY_COLUMN, DatasetProvider};
use crate::model::provider::ModelProvider;

/// Pollutant columns observed in the city/day datasets.
pub const KNOWN_POLLUTANTS: [&str; 12] = [
    "PM2.5", "PM10", "NO", "NO2", "NOx", "NH3", "CO", "SO2", "O3", "Benzene", "Toluene", "Xylene",
];

/// Feature layout assumed when the model does not record its input columns.
///
/// This is the layout the bundled PM2.5 regressors are trained on: the
/// encoded city, day and month of the date, then the gas readings without
/// the target, Toluene and Xylene.
pub const DEFAULT_FEATURE_COLUMNS: [&str; 12] = [
    "City", "Day", "Month", "PM10", "NO", "NO2", "NOx", "NH3", "CO", "SO2", "O3", "Benzene",
];

/// How the expected column list was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSource {
    /// Read from the model; order and names are binding.
    Model,
    /// The configured static list.
    Fallback,
}

/// Zero-based codes for the values of one categorical column.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalEncoding {
    categories: Vec<String>,
    codes: HashMap<String, usize>,
}

impl CategoricalEncoding {
    /// Codes follow the order of `categories`; repeated values keep their
    /// first code.
    pub fn new<S: AsRef<str>>(categories: impl IntoIterator<Item = S>) -> Self {
        let mut encoding = CategoricalEncoding {
            categories: Vec::new(),
            codes: HashMap::new(),
        };
        for category in categories {
            let category = category.as_ref();
            if !encoding.codes.contains_key(category) {
                encoding
                    .codes
                    .insert(category.to_string(), encoding.categories.len());
                encoding.categories.push(category.to_string());
            }
        }
        encoding
    }

    pub fn code(&self, category: &str) -> Option<usize> {
        self.codes.get(category).copied()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Ordered feature columns plus the encodings of categorical ones.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    expected_columns: Vec<String>,
    categorical_encodings: BTreeMap<String, CategoricalEncoding>,
    source: SchemaSource,
}

impl FeatureSchema {
    /// Ask the model for its input columns, falling back to `fallback` when it
    /// does not record them. `City` is encoded by first appearance in the
    /// dataset when it is among the columns.
    pub fn discover<M, D>(model: &M, dataset: &D, fallback: &[String]) -> Self
    where
        M: ModelProvider + ?Sized,
        D: DatasetProvider + ?Sized,
    {
        let schema = match model.feature_names() {
            Some(names) => Self::from_columns(names.to_vec(), SchemaSource::Model, dataset),
            None => {
                if let Some(width) = model.n_features() {
                    if width != fallback.len() {
                        warn!(
                            model_width = width,
                            fallback_width = fallback.len(),
                            "model does not record its feature names and the fallback list has a different width"
                        );
                    }
                }
                Self::from_columns(fallback.to_vec(), SchemaSource::Fallback, dataset)
            }
        };
        info!(
            source = ?schema.source,
            columns = %schema.expected_columns.join(","),
            "feature schema resolved"
        );
        schema
    }

    pub fn from_columns<D: DatasetProvider + ?Sized>(
        expected_columns: Vec<String>,
        source: SchemaSource,
        dataset: &D,
    ) -> Self {
        let mut categorical_encodings = BTreeMap::new();
        if expected_columns.iter().any(|c| c == CITY_COLUMN) {
            categorical_encodings.insert(
                CITY_COLUMN.to_string(),
                CategoricalEncoding::new(dataset.cities()),
            );
        }
        FeatureSchema {
            expected_columns,
            categorical_encodings,
            source,
        }
    }

    pub fn expected_columns(&self) -> &[String] {
        &self.expected_columns
    }

    pub fn expects(&self, column: &str) -> bool {
        self.expected_columns.iter().any(|c| c == column)
    }

    pub fn encoding(&self, column: &str) -> Option<&CategoricalEncoding> {
        self.categorical_encodings.get(column)
    }

    pub fn categorical_encodings(&self) -> &BTreeMap<String, CategoricalEncoding> {
        &self.categorical_encodings
    }

    pub fn source(&self) -> SchemaSource {
        self.source
    }

    /// Whether a column may be zero-filled when the dataset has no mean.
    ///
    /// Every fallback column may. For a model-supplied schema the column must
    /// be present in the dataset (even if entirely blank) or be a known
    /// pollutant or calendar field.
    pub fn allows_zero_fill<D: DatasetProvider + ?Sized>(&self, column: &str, dataset: &D) -> bool {
        match self.source {
            SchemaSource::Fallback => true,
            SchemaSource::Model => {
                dataset.has_column(column)
                    || KNOWN_POLLUTANTS.contains(&column)
                    || CALENDAR_COLUMNS.contains(&column)
            }
        }
    }
}

pub fn default_feature_columns() -> Vec<String> {
    DEFAULT_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::provider::ModelError;
    use ndarray::Array2;

    struct Cities(Vec<String>);

    impl DatasetProvider for Cities {
        fn cities(&self) -> &[String] {
            &self.0
        }
        fn column_mean(&self, _: &str) -> Option<f64> {
            None
        }
        fn has_column(&self, column: &str) -> bool {
            column == CITY_COLUMN
        }
    }

    struct Opaque {
        names: Option<Vec<String>>,
        width: Option<usize>,
    }

    impl ModelProvider for Opaque {
        fn predict(&self, rows: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
            Ok(vec![0.0; rows.nrows()])
        }
        fn feature_names(&self) -> Option<&[String]> {
            self.names.as_deref()
        }
        fn n_features(&self) -> Option<usize> {
            self.width
        }
    }

    fn cities() -> Cities {
        Cities(vec!["Delhi".into(), "Agra".into(), "Delhi".into()])
    }

    #[test]
    fn encoding_uses_first_appearance_order() {
        let enc = CategoricalEncoding::new(["Delhi", "Agra", "Delhi", "Bhopal"]);
        assert_eq!(enc.categories(), ["Delhi", "Agra", "Bhopal"]);
        assert_eq!(enc.code("Delhi"), Some(0));
        assert_eq!(enc.code("Bhopal"), Some(2));
        assert_eq!(enc.code("Pune"), None);
    }

    #[test]
    fn model_columns_take_precedence() {
        let model = Opaque {
            names: Some(vec!["PM10".into(), "City".into()]),
            width: Some(2),
        };
        let schema = FeatureSchema::discover(&model, &cities(), &default_feature_columns());
        assert_eq!(schema.source(), SchemaSource::Model);
        assert_eq!(schema.expected_columns(), ["PM10", "City"]);
        assert_eq!(schema.encoding("City").unwrap().code("Agra"), Some(1));
    }

    #[test]
    fn fallback_used_when_model_has_no_names() {
        let model = Opaque {
            names: None,
            width: Some(3),
        };
        let fallback = vec!["Day".to_string(), "PM10".to_string()];
        let schema = FeatureSchema::discover(&model, &cities(), &fallback);
        assert_eq!(schema.source(), SchemaSource::Fallback);
        assert_eq!(schema.expected_columns(), ["Day", "PM10"]);
        assert!(schema.encoding("City").is_none());
        assert!(schema.allows_zero_fill("Humidity", &cities()));
    }

    #[test]
    fn model_schema_only_zero_fills_known_features() {
        let model = Opaque {
            names: Some(vec!["Benzene".into(), "Humidity".into()]),
            width: None,
        };
        let ds = cities();
        let schema = FeatureSchema::discover(&model, &ds, &[]);
        assert!(schema.allows_zero_fill("Benzene", &ds));
        assert!(schema.allows_zero_fill("Month", &ds));
        assert!(!schema.allows_zero_fill("Humidity", &ds));
    }

    #[test]
    fn model_schema_zero_fills_columns_the_dataset_carries() {
        let model = Opaque {
            names: Some(vec!["City".into(), "Humidity".into()]),
            width: None,
        };
        let ds = cities();
        let schema = FeatureSchema::discover(&model, &ds, &[]);
        assert!(schema.allows_zero_fill("City", &ds));
        assert!(!schema.allows_zero_fill("Humidity", &ds));
    }
}
