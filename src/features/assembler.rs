//! Turns loose user inputs into a feature row the model accepts.
//!
//! Assembly runs in a fixed order: every raw value is coerced first (so bad
//! input is reported before anything else), then the city code and the
//! calendar fields derived from the date, then the explicit readings, then
//! dataset means for whatever the schema still needs. Finally the row is
//! reconciled against the schema.
//!
//! Missing readings are imputed with the mean over the *whole* dataset, not
//! the selected city or month. That is a coarse estimate, kept because the
//! shipped models were used with exactly this imputation.

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::data::dataset::{
    CITY_COLUMN, DATE_COLUMN, DAY_COLUMN, DatasetProvider, MONTH_COLUMN, YEAR_COLUMN, parse_date,
};
use crate::error::{PredictionError, SchemaMismatch};
use crate::features::row::{FeatureRow, RawInputs, RawValue, ValueSource};
use crate::features::schema::FeatureSchema;

/// Inputs after type coercion.
struct Coerced {
    city: Option<String>,
    date: Option<NaiveDate>,
    readings: Vec<(String, f64)>,
}

/// Builds [`FeatureRow`]s against one dataset and one schema.
pub struct FeatureAssembler<'a, D: DatasetProvider + ?Sized> {
    dataset: &'a D,
    schema: &'a FeatureSchema,
}

impl<'a, D: DatasetProvider + ?Sized> FeatureAssembler<'a, D> {
    pub fn new(dataset: &'a D, schema: &'a FeatureSchema) -> Self {
        FeatureAssembler { dataset, schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.schema
    }

    /// Assemble one row from `raw`.
    ///
    /// The result has exactly the schema's columns, in the schema's order,
    /// whatever order the inputs were entered in.
    pub fn assemble(&self, raw: &RawInputs) -> Result<FeatureRow, PredictionError> {
        let coerced = coerce(raw)?;
        let mut row = FeatureRow::new();

        if let Some(encoding) = self.schema.encoding(CITY_COLUMN) {
            let city = coerced.city.as_deref().ok_or_else(|| {
                PredictionError::invalid_input(CITY_COLUMN, "", "a city must be selected")
            })?;
            let code = encoding.code(city).ok_or_else(|| {
                PredictionError::invalid_input(
                    CITY_COLUMN,
                    city,
                    format!("unknown city; expected one of: {}", encoding.categories().join(", ")),
                )
            })?;
            row.push(CITY_COLUMN, code as f64, ValueSource::Encoded);
        }

        if let Some(date) = coerced.date {
            for column in self.schema.expected_columns() {
                if let Some(value) = calendar_value(column, date) {
                    row.push(column.clone(), value, ValueSource::Derived);
                }
            }
        }

        for (column, value) in &coerced.readings {
            if row.replace(column, *value, ValueSource::Supplied) {
                continue;
            }
            if self.schema.expects(column) {
                row.push(column.clone(), *value, ValueSource::Supplied);
            } else {
                debug!(column = %column, "input is not a model feature, ignoring");
            }
        }

        let mut unresolved = Vec::new();
        for column in self.schema.expected_columns() {
            if row.contains(column) {
                continue;
            }
            match self.dataset.column_mean(column) {
                Some(mean) => row.push(column.clone(), mean, ValueSource::DatasetMean),
                None if self.schema.allows_zero_fill(column, self.dataset) => {
                    debug!(column = %column, "no dataset mean, substituting zero");
                    row.push(column.clone(), 0.0, ValueSource::Zero);
                }
                None => unresolved.push(column.clone()),
            }
        }

        if !unresolved.is_empty() {
            debug!(unresolved = %unresolved.join(","), "schema columns with no value");
            return Err(SchemaMismatch::new(
                self.schema.expected_columns().to_vec(),
                row.columns().to_vec(),
            )
            .into());
        }

        let row = self.reconcile(&row)?;
        debug!(row = %row, "feature row assembled");
        Ok(row)
    }

    /// Assemble one row per city, sharing every other input.
    pub fn assemble_for_cities<S: AsRef<str>>(
        &self,
        raw: &RawInputs,
        cities: &[S],
    ) -> Result<Vec<FeatureRow>, PredictionError> {
        cities
            .iter()
            .map(|city| {
                let inputs = raw.clone().with(CITY_COLUMN, city.as_ref());
                self.assemble(&inputs)
            })
            .collect()
    }

    fn reconcile(&self, row: &FeatureRow) -> Result<FeatureRow, PredictionError> {
        let expected = self.schema.expected_columns();
        row.select(expected).ok_or_else(|| {
            SchemaMismatch::new(expected.to_vec(), row.columns().to_vec()).into()
        })
    }
}

fn coerce(raw: &RawInputs) -> Result<Coerced, PredictionError> {
    let mut coerced = Coerced {
        city: None,
        date: None,
        readings: Vec::new(),
    };

    for (column, value) in raw.iter() {
        match column {
            CITY_COLUMN => {
                let city = value.to_string();
                let city = city.trim();
                if city.is_empty() {
                    return Err(PredictionError::invalid_input(column, city, "city is empty"));
                }
                coerced.city = Some(city.to_string());
            }
            DATE_COLUMN => {
                let date = match value {
                    RawValue::Date(date) => Some(*date),
                    RawValue::Text(text) => parse_date(text),
                    RawValue::Number(_) => None,
                };
                let date = date.ok_or_else(|| {
                    PredictionError::invalid_input(
                        column,
                        value.to_string(),
                        "expected a date as YYYY-MM-DD",
                    )
                })?;
                coerced.date = Some(date);
            }
            _ => coerced.readings.push((column.to_string(), coerce_number(column, value)?)),
        }
    }
    Ok(coerced)
}

fn coerce_number(column: &str, value: &RawValue) -> Result<f64, PredictionError> {
    let number = match value {
        RawValue::Number(number) => *number,
        RawValue::Text(text) => text.trim().parse::<f64>().map_err(|_| {
            PredictionError::invalid_input(column, text.as_str(), "not a number")
        })?,
        RawValue::Date(_) => {
            return Err(PredictionError::invalid_input(
                column,
                value.to_string(),
                "expected a number, got a date",
            ));
        }
    };
    if !number.is_finite() {
        return Err(PredictionError::invalid_input(
            column,
            value.to_string(),
            "value must be finite",
        ));
    }
    Ok(number)
}

fn calendar_value(column: &str, date: NaiveDate) -> Option<f64> {
    match column {
        DAY_COLUMN => Some(date.day() as f64),
        MONTH_COLUMN => Some(date.month() as f64),
        YEAR_COLUMN => Some(date.year() as f64),
        _ => None,
    }
}
