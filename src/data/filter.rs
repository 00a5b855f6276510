//! Filtered views over the dataset for exploration and CSV export.

use chrono::NaiveDate;
use csv::Writer;
use std::io::Write;

use crate::data::dataset::{CITY_COLUMN, DATE_COLUMN, Dataset, Observation};
use crate::error::Result;

/// Selection of rows and pollutant columns.
///
/// Empty `cities` or `pollutants` means "all". Any date bound excludes rows
/// whose date did not parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationFilter {
    pub cities: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub pollutants: Vec<String>,
}

impl ObservationFilter {
    pub fn matches(&self, observation: &Observation) -> bool {
        if !self.cities.is_empty() && !self.cities.iter().any(|c| *c == observation.city) {
            return false;
        }
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(date) = observation.date else {
            return false;
        };
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// Count, mean and range of one pollutant within a view.
#[derive(Debug, Clone, PartialEq)]
pub struct PollutantSummary {
    pub pollutant: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Rows of a [`Dataset`] selected by an [`ObservationFilter`].
#[derive(Debug, Clone)]
pub struct DatasetView<'a> {
    rows: Vec<&'a Observation>,
    pollutants: Vec<String>,
}

impl Dataset {
    pub fn view(&self, filter: &ObservationFilter) -> DatasetView<'_> {
        let pollutants = if filter.pollutants.is_empty() {
            self.pollutant_columns().into_iter().map(str::to_string).collect()
        } else {
            filter.pollutants.clone()
        };
        DatasetView {
            rows: self.observations().iter().filter(|obs| filter.matches(obs)).collect(),
            pollutants,
        }
    }
}

impl<'a> DatasetView<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[&'a Observation] {
        &self.rows
    }

    pub fn pollutants(&self) -> &[String] {
        &self.pollutants
    }

    pub fn summary(&self) -> Vec<PollutantSummary> {
        self.pollutants
            .iter()
            .map(|pollutant| {
                let values: Vec<f64> = self.rows.iter().filter_map(|r| r.value(pollutant)).collect();
                let count = values.len();
                let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
                PollutantSummary {
                    pollutant: pollutant.clone(),
                    count,
                    mean,
                    min: values.iter().copied().reduce(f64::min),
                    max: values.iter().copied().reduce(f64::max),
                }
            })
            .collect()
    }

    /// Write the view as CSV: `City`, `Date`, then the selected pollutants.
    ///
    /// Missing values are written as empty cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = Writer::from_writer(writer);
        let mut header = vec![CITY_COLUMN, DATE_COLUMN];
        header.extend(self.pollutants.iter().map(String::as_str));
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.city.clone(), row.raw_date.clone()];
            record.extend(
                self.pollutants
                    .iter()
                    .map(|p| row.value(p).map(|v| v.to_string()).unwrap_or_default()),
            );
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset() -> Dataset {
        Dataset::from_reader(
            "City,Date,PM10,NO2\n\
             Delhi,2020-01-01,200,40\n\
             Mumbai,2020-01-02,80,\n\
             Delhi,2020-01-05,180,30\n\
             Delhi,bad,100,10\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn default_filter_keeps_everything() {
        let ds = dataset();
        let view = ds.view(&ObservationFilter::default());
        assert_eq!(view.len(), 4);
        assert_eq!(view.pollutants(), ["PM10", "NO2"]);
    }

    #[test]
    fn date_range_is_inclusive_and_drops_unparsed_dates() {
        let ds = dataset();
        let filter = ObservationFilter {
            cities: vec!["Delhi".into()],
            from: Some(date(2020, 1, 1)),
            to: Some(date(2020, 1, 5)),
            ..Default::default()
        };
        let view = ds.view(&filter);
        assert_eq!(view.len(), 2);
        assert!(view.rows().iter().all(|r| r.city == "Delhi" && r.date.is_some()));
    }

    #[test]
    fn summary_ignores_missing_values() {
        let ds = dataset();
        let filter = ObservationFilter {
            pollutants: vec!["NO2".into()],
            ..Default::default()
        };
        let summary = ds.view(&filter).summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].count, 3);
        assert_eq!(summary[0].mean, Some(80.0 / 3.0));
        assert_eq!(summary[0].min, Some(10.0));
        assert_eq!(summary[0].max, Some(40.0));
    }

    #[test]
    fn export_writes_selected_columns_with_blank_missing_cells() {
        let ds = dataset();
        let filter = ObservationFilter {
            cities: vec!["Mumbai".into()],
            pollutants: vec!["PM10".into(), "NO2".into()],
            ..Default::default()
        };
        let mut out = Vec::new();
        ds.view(&filter).write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "City,Date,PM10,NO2\nMumbai,2020-01-02,80,\n");
    }
}
