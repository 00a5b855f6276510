use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

use crate::data::filter::DatasetView;
use crate::error::{Error, Result};

const SERIES_COLORS: [RGBColor; 6] = [RED, BLUE, GREEN, MAGENTA, CYAN, BLACK];

/// Dated values of one pollutant for one city, in date order.
///
/// Rows without a parsed date or without a value are skipped.
pub fn pollutant_series(view: &DatasetView<'_>, city: &str, pollutant: &str) -> Vec<(NaiveDate, f64)> {
    let mut series: Vec<(NaiveDate, f64)> = view
        .rows()
        .iter()
        .filter(|obs| obs.city == city)
        .filter_map(|obs| Some((obs.date?, obs.value(pollutant)?)))
        .collect();
    series.sort_by_key(|(date, _)| *date);
    series
}

/// Draw `pollutant` over time, one line per city in the view.
pub fn create_trend_plot(view: &DatasetView<'_>, pollutant: &str, path: &Path) -> Result<()> {
    let mut cities: Vec<&str> = Vec::new();
    for obs in view.rows() {
        if !cities.contains(&obs.city.as_str()) {
            cities.push(&obs.city);
        }
    }
    let series: Vec<(&str, Vec<(NaiveDate, f64)>)> = cities
        .into_iter()
        .map(|city| (city, pollutant_series(view, city, pollutant)))
        .filter(|(_, points)| !points.is_empty())
        .collect();

    if series.is_empty() {
        return Err(Error::EmptySeries(format!("no {pollutant} values in the selection")));
    }

    let points = || series.iter().flat_map(|(_, points)| points.iter());
    let (start, end) = points().fold((NaiveDate::MAX, NaiveDate::MIN), |(start, end), (date, _)| {
        (start.min(*date), end.max(*date))
    });
    let span = (end - start).num_days().max(1);
    let y_range = value_axis(points().map(|(_, value)| *value));

    let root = BitMapBackend::new(path, (1024, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{pollutant} over time"), ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0i64..span, y_range)
        .map_err(plot_error)?;

    let label_date = |offset: &i64| (start + Duration::days(*offset)).format("%Y-%m-%d").to_string();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Date")
        .y_desc(format!("{pollutant} (µg/m³)"))
        .x_label_formatter(&label_date)
        .draw()
        .map_err(plot_error)?;

    for (idx, (city, points)) in series.iter().enumerate() {
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        chart
            .draw_series(LineSeries::new(
                points.iter().map(|(date, value)| ((*date - start).num_days(), *value)),
                &color,
            ))
            .map_err(plot_error)?
            .label(*city)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Y-axis range covering every value, anchored at zero, with 10% headroom.
fn value_axis(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((0f64, 0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let low = if min < 0.0 { min * 1.1 } else { 0.0 };
    let high = if max > 0.0 { max * 1.1 } else { 1.0 };
    low..high
}

fn plot_error<E: std::fmt::Display>(err: E) -> Error {
    Error::Plot(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Dataset;
    use crate::data::filter::ObservationFilter;

    #[test]
    fn value_axis_extends_below_zero_for_negative_values() {
        let axis = value_axis([-10.0, 5.0, 20.0].into_iter());
        assert!(axis.start <= -10.0);
        assert!(axis.end >= 20.0);

        let axis = value_axis([3.0, 7.0].into_iter());
        assert_eq!(axis.start, 0.0);
        assert!(axis.end >= 7.0);

        assert_eq!(value_axis([-4.0].into_iter()).end, 1.0);
    }

    #[test]
    fn series_is_sorted_and_skips_gaps() {
        let ds = Dataset::from_reader(
            "City,Date,PM10\n\
             Delhi,2020-01-03,30\n\
             Delhi,2020-01-01,10\n\
             Delhi,2020-01-02,\n\
             Delhi,oops,99\n\
             Agra,2020-01-01,5\n"
                .as_bytes(),
        )
        .unwrap();
        let view = ds.view(&ObservationFilter::default());
        let series = pollutant_series(&view, "Delhi", "PM10");
        let d = |day| NaiveDate::from_ymd_opt(2020, 1, day).unwrap();
        assert_eq!(series, vec![(d(1), 10.0), (d(3), 30.0)]);
    }

    #[test]
    fn empty_selection_is_an_error() {
        let ds = Dataset::from_reader("City,Date,PM10\nDelhi,2020-01-01,\n".as_bytes()).unwrap();
        let view = ds.view(&ObservationFilter::default());
        let dir = tempfile::tempdir().unwrap();
        let err = create_trend_plot(&view, "PM10", &dir.path().join("out.png")).unwrap_err();
        assert!(matches!(err, Error::EmptySeries(_)));
    }
}
