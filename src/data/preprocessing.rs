use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-feature standardization parameters stored alongside a network model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStats {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl DataStats {
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Standardize each row of `x`; zero-variance columns are only centered.
    pub fn standardize(&self, x: &Array2<f64>) -> Array2<f64> {
        let std = self.std.mapv(|s| if s == 0.0 { 1.0 } else { s });
        let mean = self.mean.view().insert_axis(Axis(0));
        let std = std.view().insert_axis(Axis(0));
        (x - &mean) / &std
    }
}

/// Arithmetic mean of every column over the values that are present.
///
/// Columns where no row carries a value have no entry.
pub fn column_means<'a, I>(rows: I) -> HashMap<String, f64>
where
    I: IntoIterator<Item = &'a HashMap<String, f64>>,
{
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for row in rows {
        for (column, value) in row {
            let entry = sums.entry(column.as_str()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .filter(|(_, (_, count))| *count > 0)
        .map(|(column, (sum, count))| (column.to_string(), sum / count as f64))
        .collect()
}

/// Parse a numeric cell. Empty and non-finite cells are treated as missing.
pub fn parse_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn means_skip_missing_values() {
        let a: HashMap<String, f64> = [("PM10".to_string(), 40.0), ("NO2".to_string(), 10.0)].into();
        let b: HashMap<String, f64> = [("PM10".to_string(), 60.0)].into();
        let means = column_means([&a, &b]);
        assert_eq!(means["PM10"], 50.0);
        assert_eq!(means["NO2"], 10.0);
        assert!(!means.contains_key("CO"));
    }

    #[test]
    fn parse_cell_treats_blank_and_nan_as_missing() {
        assert_eq!(parse_cell(" 12.5 "), Some(12.5));
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("NaN"), None);
        assert_eq!(parse_cell("abc"), None);
    }

    #[test]
    fn standardize_leaves_constant_columns_centered() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let stats = DataStats {
            mean: array![2.0, 5.0],
            std: array![1.0, 0.0],
        };
        let z = stats.standardize(&x);
        assert_eq!(z, array![[-1.0, 0.0], [1.0, 0.0]]);
    }
}
