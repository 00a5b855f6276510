use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use pm25_dashboard::data::dataset::{CALENDAR_COLUMNS, CITY_COLUMN, DATE_COLUMN, parse_date};
use pm25_dashboard::data::filter::ObservationFilter;
use pm25_dashboard::utils::input::{prompt_line, prompt_or};
use pm25_dashboard::utils::plot::create_trend_plot;
use pm25_dashboard::{
    Config, Dataset, DatasetProvider, FeatureRow, PendingPrediction, PredictionError,
    PredictionOutcome, RawInputs, Session,
};

#[derive(Parser)]
#[command(name = "pm25-dashboard", version, about = "Explore air-quality data and predict PM2.5")]
struct Cli {
    /// JSON config file; environment and flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// City/day CSV dataset.
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Serialized regression model.
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List cities with their model encoding.
    Cities,
    /// Show the feature columns the model will receive.
    Schema,
    /// Predict PM2.5 for one city and date.
    Predict {
        #[command(flatten)]
        inputs: PredictArgs,
        /// Prompt for the date, city and readings.
        #[arg(long)]
        interactive: bool,
    },
    /// Predict PM2.5 for every city with the same readings.
    PredictAll {
        #[command(flatten)]
        inputs: PredictArgs,
    },
    /// Per-pollutant count, mean and range of a selection.
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Write a selection as CSV.
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Draw a pollutant over time, one line per city.
    Plot {
        #[command(flatten)]
        filter: FilterArgs,
        /// Pollutant column to draw.
        #[arg(default_value = "PM2.5")]
        pollutant: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PredictArgs {
    #[arg(long)]
    city: Option<String>,
    /// Date as YYYY-MM-DD.
    #[arg(long)]
    date: Option<String>,
    /// A reading as COLUMN=VALUE, e.g. --set PM10=80. Repeatable.
    #[arg(long = "set", value_parser = parse_assignment)]
    readings: Vec<(String, String)>,
}

impl PredictArgs {
    fn to_raw_inputs(&self) -> RawInputs {
        let mut raw = RawInputs::new();
        if let Some(city) = &self.city {
            raw.set(CITY_COLUMN, city.as_str());
        }
        if let Some(date) = &self.date {
            raw.set(DATE_COLUMN, date.as_str());
        }
        for (column, value) in &self.readings {
            raw.set(column.as_str(), value.as_str());
        }
        raw
    }
}

#[derive(Args)]
struct FilterArgs {
    /// Restrict to a city. Repeatable.
    #[arg(long = "city")]
    cities: Vec<String>,
    #[arg(long, value_parser = parse_date_arg)]
    from: Option<NaiveDate>,
    #[arg(long, value_parser = parse_date_arg)]
    to: Option<NaiveDate>,
    /// Restrict to a pollutant column. Repeatable.
    #[arg(long = "pollutant")]
    pollutants: Vec<String>,
}

impl From<FilterArgs> for ObservationFilter {
    fn from(args: FilterArgs) -> Self {
        ObservationFilter {
            cities: args.cities,
            from: args.from,
            to: args.to,
            pollutants: args.pollutants,
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got `{raw}`"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in `{raw}`"));
    }
    Ok((column.to_string(), value.trim().to_string()))
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got `{raw}`"))
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dataset) = cli.dataset {
        config.dataset_path = dataset;
    }
    if let Some(model) = cli.model {
        config.model_path = model;
    }

    match cli.command {
        Command::Cities => {
            let dataset = Dataset::from_path(&config.dataset_path)?;
            for (code, city) in dataset.cities().iter().enumerate() {
                println!("{code:>3}  {city}");
            }
        }
        Command::Schema => {
            let session = Session::open(&config)?;
            let schema = session.schema();
            println!("Feature columns ({:?}):", schema.source());
            for column in schema.expected_columns() {
                let origin = if column == CITY_COLUMN {
                    "encoded city".to_string()
                } else if CALENDAR_COLUMNS.contains(&column.as_str()) {
                    "from date".to_string()
                } else if let Some(mean) = session.dataset().column_mean(column) {
                    format!("input, default {mean:.2}")
                } else if schema.allows_zero_fill(column, session.dataset()) {
                    "input, default 0".to_string()
                } else {
                    "input, required".to_string()
                };
                println!("  {column:<10} {origin}");
            }
        }
        Command::Predict {
            inputs,
            interactive,
        } => {
            let session = Session::open(&config)?;
            let raw = if interactive {
                prompt_inputs(&session)?
            } else {
                inputs.to_raw_inputs()
            };
            return Ok(run_prediction(&session, &raw));
        }
        Command::PredictAll { inputs } => {
            let session = Session::open(&config)?;
            let raw = inputs.to_raw_inputs();
            let cities = session.dataset().cities();
            match session.predict_for_cities(&raw, cities) {
                Ok(results) => {
                    for (city, prediction) in results {
                        println!("{city:<20} {prediction}");
                    }
                }
                Err(err) => return Ok(report_failure(&err)),
            }
        }
        Command::Summary { filter } => {
            let dataset = Dataset::from_path(&config.dataset_path)?;
            let view = dataset.view(&filter.into());
            println!("{} observations", view.len());
            for summary in view.summary() {
                let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
                println!(
                    "  {:<10} n={:<6} mean={:<10} min={:<10} max={}",
                    summary.pollutant,
                    summary.count,
                    fmt(summary.mean),
                    fmt(summary.min),
                    fmt(summary.max)
                );
            }
        }
        Command::Export { filter, out } => {
            let dataset = Dataset::from_path(&config.dataset_path)?;
            let view = dataset.view(&filter.into());
            match out {
                Some(path) => view.write_csv(BufWriter::new(File::create(&path)?))?,
                None => view.write_csv(io::stdout().lock())?,
            }
        }
        Command::Plot {
            filter,
            pollutant,
            out,
        } => {
            let dataset = Dataset::from_path(&config.dataset_path)?;
            let view = dataset.view(&filter.into());
            let path = out.unwrap_or_else(|| config.plot_path.clone());
            create_trend_plot(&view, &pollutant, &path)?;
            println!("Plot saved to {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_prediction(session: &Session, raw: &RawInputs) -> ExitCode {
    let row = match session.assembler().assemble(raw) {
        Ok(row) => row,
        Err(err) => return report_failure(&err),
    };
    print_row(&row);

    match PendingPrediction::new(row).resolve(&session.invoker()) {
        PredictionOutcome::Succeeded(prediction) => {
            println!("PM2.5: {prediction}");
            ExitCode::SUCCESS
        }
        PredictionOutcome::Failed(err) => report_failure(&err),
    }
}

fn print_row(row: &FeatureRow) {
    println!("Model input (* = dataset default):");
    for (column, value, source) in row.iter() {
        let marker = if source.is_default() { "*" } else { "" };
        println!("  {column:<10} {value}{marker}");
    }
}

fn report_failure(err: &PredictionError) -> ExitCode {
    eprintln!("{}: {err}", err.kind());
    ExitCode::from(2)
}

/// Ask for the date, city and each reading the model takes.
fn prompt_inputs(session: &Session) -> io::Result<RawInputs> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let dataset = session.dataset();
    let default_date = dataset
        .date_bounds()
        .map(|(start, _)| start.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "2020-01-01".to_string());
    let default_city = dataset.cities().first().cloned().unwrap_or_default();

    let mut raw = RawInputs::new();
    raw.set(DATE_COLUMN, prompt_or(&mut input, &mut output, "Date", &default_date)?);
    raw.set(CITY_COLUMN, prompt_or(&mut input, &mut output, "City", &default_city)?);

    for column in session.schema().expected_columns() {
        if column == CITY_COLUMN || CALENDAR_COLUMNS.contains(&column.as_str()) {
            continue;
        }
        let prompt = format!("{column} (blank for dataset mean): ");
        match prompt_line(&mut input, &mut output, &prompt)? {
            Some(value) if !value.is_empty() => raw.set(column.as_str(), value),
            Some(_) => {}
            None => break,
        }
    }
    Ok(raw)
}
