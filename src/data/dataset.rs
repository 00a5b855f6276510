//! Historical observations loaded from a city/day CSV file.
//!
//! The file is read once per session. Everything the feature assembler needs
//! (distinct cities, column means, column presence) is computed at load time
//! and exposed through [`DatasetProvider`].

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use csv::{Reader, StringRecord};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::data::preprocessing::{column_means, parse_cell};
use crate::error::{Error, Result};

pub const CITY_COLUMN: &str = "City";
pub const DATE_COLUMN: &str = "Date";
pub const YEAR_COLUMN: &str = "Year";
pub const MONTH_COLUMN: &str = "Month";
pub const DAY_COLUMN: &str = "Day";

/// Calendar columns derived from `Date`.
pub const CALENDAR_COLUMNS: [&str; 3] = [YEAR_COLUMN, MONTH_COLUMN, DAY_COLUMN];

/// Read-only view of the historical data the feature assembler consults.
pub trait DatasetProvider {
    /// Distinct city names in order of first appearance.
    fn cities(&self) -> &[String];

    /// Mean of a numeric column over all observations, if it has any values.
    fn column_mean(&self, column: &str) -> Option<f64>;

    /// Whether the dataset carries a column with this name.
    fn has_column(&self, column: &str) -> bool;
}

/// One row of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub city: String,
    /// Parsed date; `None` when the raw text is not a valid date.
    pub date: Option<NaiveDate>,
    pub raw_date: String,
    values: HashMap<String, f64>,
    labels: BTreeMap<String, String>,
}

impl Observation {
    pub fn new(city: impl Into<String>, date: NaiveDate) -> Self {
        Observation {
            city: city.into(),
            date: Some(date),
            raw_date: date.format("%Y-%m-%d").to_string(),
            values: HashMap::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Builder-style setter for a numeric column.
    pub fn with_value(mut self, column: impl Into<String>, value: f64) -> Self {
        self.values.insert(column.into(), value);
        self
    }

    /// Builder-style setter for a text column such as `AQI_Bucket`.
    pub fn with_label(mut self, column: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(column.into(), label.into());
        self
    }

    /// Numeric value of `column`, `None` when missing.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }

    pub fn label(&self, column: &str) -> Option<&str> {
        self.labels.get(column).map(String::as_str)
    }

    pub fn values(&self) -> &HashMap<String, f64> {
        &self.values
    }

    fn derive_calendar_fields(&mut self) {
        let Some(date) = self.date else { return };
        for (column, value) in [
            (YEAR_COLUMN, date.year() as f64),
            (MONTH_COLUMN, date.month() as f64),
            (DAY_COLUMN, date.day() as f64),
        ] {
            self.values.entry(column.to_string()).or_insert(value);
        }
    }
}

/// Parse a dataset or user-supplied date.
///
/// Accepts `YYYY-MM-DD` and `YYYY-MM-DD HH:MM:SS`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// The loaded, immutable dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    observations: Vec<Observation>,
    columns: Vec<String>,
    numeric_columns: Vec<String>,
    cities: Vec<String>,
    means: HashMap<String, f64>,
}

impl Dataset {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            cities = dataset.cities.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Read a CSV with a header row. `City` and `Date` are required.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        let city_idx = column_index(&headers, CITY_COLUMN)?;
        let date_idx = column_index(&headers, DATE_COLUMN)?;

        let mut records = Vec::new();
        for result in rdr.records() {
            records.push(result?);
        }

        // A column is numeric when every non-empty cell parses.
        let numeric: Vec<bool> = (0..headers.len())
            .map(|idx| {
                idx != city_idx
                    && idx != date_idx
                    && records.iter().all(|record| {
                        let cell = record.get(idx).unwrap_or("").trim();
                        cell.is_empty() || cell.parse::<f64>().is_ok()
                    })
            })
            .collect();

        let mut observations = Vec::with_capacity(records.len());
        for record in &records {
            let raw_date = record.get(date_idx).unwrap_or("").trim().to_string();
            let mut observation = Observation {
                city: record.get(city_idx).unwrap_or("").trim().to_string(),
                date: parse_date(&raw_date),
                raw_date,
                values: HashMap::new(),
                labels: BTreeMap::new(),
            };
            for (idx, header) in headers.iter().enumerate() {
                if idx == city_idx || idx == date_idx {
                    continue;
                }
                let cell = record.get(idx).unwrap_or("");
                if numeric[idx] {
                    if let Some(value) = parse_cell(cell) {
                        observation.values.insert(header.to_string(), value);
                    }
                } else if !cell.trim().is_empty() {
                    observation
                        .labels
                        .insert(header.to_string(), cell.trim().to_string());
                }
            }
            observations.push(observation);
        }

        let columns: Vec<String> = headers.iter().map(str::to_string).collect();
        let numeric_columns = headers
            .iter()
            .zip(&numeric)
            .filter(|(_, is_numeric)| **is_numeric)
            .map(|(name, _)| name.to_string())
            .collect();
        Self::build(observations, columns, numeric_columns)
    }

    /// Build a dataset from in-memory observations.
    ///
    /// Column order is `City`, `Date`, then numeric columns sorted by name,
    /// then label columns sorted by name.
    pub fn from_observations(observations: Vec<Observation>) -> Result<Self> {
        let mut numeric: Vec<String> = observations
            .iter()
            .flat_map(|obs| obs.values.keys().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        numeric.sort();
        let mut labels: Vec<String> = observations
            .iter()
            .flat_map(|obs| obs.labels.keys().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        labels.sort();

        let mut columns = vec![CITY_COLUMN.to_string(), DATE_COLUMN.to_string()];
        columns.extend(numeric.iter().cloned());
        columns.extend(labels);
        Self::build(observations, columns, numeric)
    }

    fn build(
        mut observations: Vec<Observation>,
        mut columns: Vec<String>,
        mut numeric_columns: Vec<String>,
    ) -> Result<Self> {
        if observations.is_empty() {
            return Err(Error::EmptyDataset);
        }

        // Derived calendar fields, unless the file already carries them.
        for column in CALENDAR_COLUMNS {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
                numeric_columns.push(column.to_string());
            }
        }
        for observation in &mut observations {
            observation.derive_calendar_fields();
        }

        let cities: Vec<String> = {
            let mut seen = HashSet::new();
            observations
                .iter()
                .filter(|obs| seen.insert(obs.city.as_str()))
                .map(|obs| obs.city.clone())
                .collect()
        };

        let means = column_means(observations.iter().map(|obs| &obs.values));
        let skipped = observations.iter().filter(|obs| obs.date.is_none()).count();
        if skipped > 0 {
            debug!(skipped, "observations with unparseable dates");
        }

        Ok(Dataset {
            observations,
            columns,
            numeric_columns,
            cities,
            means,
        })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// All column names, in file order followed by derived calendar columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    /// Numeric columns other than the calendar fields.
    pub fn pollutant_columns(&self) -> Vec<&str> {
        self.numeric_columns
            .iter()
            .map(String::as_str)
            .filter(|c| !CALENDAR_COLUMNS.contains(c))
            .collect()
    }

    /// Earliest and latest parsed dates.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.observations.iter().filter_map(|obs| obs.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

impl DatasetProvider for Dataset {
    fn cities(&self) -> &[String] {
        &self.cities
    }

    fn column_mean(&self, column: &str) -> Option<f64> {
        self.means.get(column).copied()
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| Error::MissingColumn(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
City,Date,PM2.5,PM10,NO2,AQI_Bucket
Delhi,2020-01-01,120.5,200,40,Poor
Mumbai,2020-01-01,60,,20,Moderate
Delhi,2020-01-02,110.5,180,,Poor
Chennai,not-a-date,30,50,10,Good
Mumbai,2020-01-03 00:00:00,55,90,30,
";

    fn dataset() -> Dataset {
        Dataset::from_reader(CSV.as_bytes()).unwrap()
    }

    #[test]
    fn cities_follow_first_appearance() {
        let ds = dataset();
        assert_eq!(ds.cities(), ["Delhi", "Mumbai", "Chennai"]);
    }

    #[test]
    fn means_ignore_blank_cells() {
        let ds = dataset();
        assert_eq!(ds.column_mean("PM10"), Some((200.0 + 180.0 + 50.0 + 90.0) / 4.0));
        assert_eq!(ds.column_mean("NO2"), Some(25.0));
        assert_eq!(ds.column_mean("Humidity"), None);
    }

    #[test]
    fn text_columns_are_labels_not_numbers() {
        let ds = dataset();
        assert!(ds.has_column("AQI_Bucket"));
        assert_eq!(ds.column_mean("AQI_Bucket"), None);
        assert_eq!(ds.observations()[0].label("AQI_Bucket"), Some("Poor"));
        assert!(!ds.numeric_columns().iter().any(|c| c == "AQI_Bucket"));
    }

    #[test]
    fn calendar_columns_are_derived_from_date() {
        let ds = dataset();
        let first = &ds.observations()[0];
        assert_eq!(first.value(DAY_COLUMN), Some(1.0));
        assert_eq!(first.value(MONTH_COLUMN), Some(1.0));
        assert_eq!(first.value(YEAR_COLUMN), Some(2020.0));
        assert!(ds.has_column(DAY_COLUMN));
        assert_eq!(ds.pollutant_columns(), vec!["PM2.5", "PM10", "NO2"]);
    }

    #[test]
    fn unparseable_dates_are_kept_without_calendar_fields() {
        let ds = dataset();
        let chennai = &ds.observations()[3];
        assert_eq!(chennai.date, None);
        assert_eq!(chennai.raw_date, "not-a-date");
        assert_eq!(chennai.value(DAY_COLUMN), None);
        assert_eq!(ds.len(), 5);
    }

    #[test]
    fn date_bounds_skip_invalid_dates() {
        let (lo, hi) = dataset().date_bounds().unwrap();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2020, 1, 3).unwrap());
    }

    #[test]
    fn missing_key_column_is_reported() {
        let err = Dataset::from_reader("Town,Date\nX,2020-01-01\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(ref c) if c == "City"));
    }

    #[test]
    fn header_only_file_is_empty_dataset() {
        let err = Dataset::from_reader("City,Date,PM10\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset));
    }

    #[test]
    fn parse_date_accepts_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2019, 12, 31);
        assert_eq!(parse_date("2019-12-31"), expected);
        assert_eq!(parse_date("2019-12-31 08:30:00"), expected);
        assert_eq!(parse_date("31/12/2019"), None);
    }
}
