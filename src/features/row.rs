use chrono::NaiveDate;
use ndarray::Array2;
use std::fmt;

/// A value as entered by the user, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(text) => f.write_str(text),
            RawValue::Number(value) => write!(f, "{value}"),
            RawValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(value: NaiveDate) -> Self {
        RawValue::Date(value)
    }
}

/// User-supplied values keyed by column name, in entry order.
///
/// Setting a column twice replaces the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInputs {
    entries: Vec<(String, RawValue)>,
}

impl RawInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawInputs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut inputs = RawInputs::new();
        for (column, value) in iter {
            inputs.set(column, value);
        }
        inputs
    }
}

/// Where a feature value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Supplied,
    /// Calendar field computed from the supplied date.
    Derived,
    /// Integer code of a categorical value.
    Encoded,
    DatasetMean,
    /// No dataset mean exists for a known feature.
    Zero,
}

impl ValueSource {
    pub fn is_default(self) -> bool {
        matches!(self, ValueSource::DatasetMean | ValueSource::Zero)
    }
}

/// One assembled record ready for the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    columns: Vec<String>,
    values: Vec<f64>,
    sources: Vec<ValueSource>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, column: impl Into<String>, value: f64, source: ValueSource) {
        self.columns.push(column.into());
        self.values.push(value);
        self.sources.push(source);
    }

    /// Overwrite an existing column; returns false when it is absent.
    pub(crate) fn replace(&mut self, column: &str, value: f64, source: ValueSource) -> bool {
        match self.position(column) {
            Some(idx) => {
                self.values[idx] = value;
                self.sources[idx] = source;
                true
            }
            None => false,
        }
    }

    /// Re-select columns in the given order. Returns `None` if any is missing.
    pub(crate) fn select(&self, columns: &[String]) -> Option<FeatureRow> {
        let mut row = FeatureRow::new();
        for column in columns {
            let idx = self.position(column)?;
            row.push(column.clone(), self.values[idx], self.sources[idx]);
        }
        Some(row)
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.position(column).map(|idx| self.values[idx])
    }

    pub fn source(&self, column: &str) -> Option<ValueSource> {
        self.position(column).map(|idx| self.sources[idx])
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64, ValueSource)> {
        self.columns
            .iter()
            .zip(&self.values)
            .zip(&self.sources)
            .map(|((c, v), s)| (c.as_str(), *v, *s))
    }

    /// Columns whose value was imputed rather than supplied or derived.
    pub fn defaulted_columns(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, _, source)| source.is_default())
            .map(|(column, _, _)| column)
            .collect()
    }
}

impl fmt::Display for FeatureRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (column, value, source)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{column}={value}")?;
            if source.is_default() {
                f.write_str("*")?;
            }
        }
        Ok(())
    }
}

/// Stack rows into a matrix, one feature row per matrix row.
///
/// Rows are assumed to share one column layout.
pub fn to_matrix(rows: &[FeatureRow]) -> Array2<f64> {
    let width = rows.first().map_or(0, FeatureRow::len);
    Array2::from_shape_fn((rows.len(), width), |(r, c)| rows[r].values[c])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_inputs_replace_in_place() {
        let inputs = RawInputs::new()
            .with("PM10", 80.0)
            .with("City", "Delhi")
            .with("PM10", "90");
        let names: Vec<&str> = inputs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["PM10", "City"]);
        assert_eq!(inputs.get("PM10"), Some(&RawValue::Text("90".into())));
    }

    #[test]
    fn select_reorders_and_detects_missing() {
        let mut row = FeatureRow::new();
        row.push("B", 2.0, ValueSource::Supplied);
        row.push("A", 1.0, ValueSource::DatasetMean);

        let order = vec!["A".to_string(), "B".to_string()];
        let selected = row.select(&order).unwrap();
        assert_eq!(selected.columns(), ["A", "B"]);
        assert_eq!(selected.values(), [1.0, 2.0]);
        assert_eq!(selected.defaulted_columns(), ["A"]);

        assert!(row.select(&["C".to_string()]).is_none());
    }

    #[test]
    fn matrix_has_one_row_per_feature_row() {
        let mut a = FeatureRow::new();
        a.push("X", 1.0, ValueSource::Supplied);
        a.push("Y", 2.0, ValueSource::Supplied);
        let mut b = FeatureRow::new();
        b.push("X", 3.0, ValueSource::Supplied);
        b.push("Y", 4.0, ValueSource::Supplied);

        let m = to_matrix(&[a.clone(), b]);
        assert_eq!(m.dim(), (2, 2));
        assert_eq!(m[[1, 0]], 3.0);
        assert_eq!(a.to_string(), "X=1, Y=2");
    }
}
