use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use diabetes_api::InputRecord;
use diabetes_dashboard::batch::{export_headers, result_cells};
use diabetes_dashboard::client::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use diabetes_dashboard::{
    export, open_table, parse_delimiter, render, run_batch, ApiClient, Progress, Scorer,
};

#[derive(Debug, Parser)]
#[command(
    name = "diabetes-dashboard",
    version,
    about = "🩺 Diabetes Prediction Dashboard",
    long_about = "Predicts diabetes risk using the Pima Indians Diabetes Dataset parameters.\n\
        All measurements should be collected under standardized clinical conditions."
)]
struct Cli {
    /// Prediction endpoint
    #[arg(long, env = "DIABETES_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Network timeout per request, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score a single patient
    Single(PatientArgs),
    /// Score every row of a CSV file
    Batch(BatchArgs),
}

fn non_negative(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{}", e))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("{} must be a non-negative number", raw))
    }
}

#[derive(Debug, Args)]
struct PatientArgs {
    /// Number of pregnancies
    #[arg(long, default_value_t = 0.0, value_parser = non_negative)]
    pregnancies: f64,
    /// Plasma glucose concentration, 2-hour oral glucose tolerance test (mg/dL)
    #[arg(long, default_value_t = 0.0, value_parser = non_negative)]
    glucose: f64,
    /// Diastolic blood pressure (mm Hg)
    #[arg(long, default_value_t = 0.0, value_parser = non_negative)]
    blood_pressure: f64,
    /// Triceps skinfold thickness (mm)
    #[arg(long, default_value_t = 0.0, value_parser = non_negative)]
    skin_thickness: f64,
    /// 2-hour serum insulin (μU/mL)
    #[arg(long, default_value_t = 0.0, value_parser = non_negative)]
    insulin: f64,
    /// Body mass index (kg/m²)
    #[arg(long, default_value_t = 0.0, value_parser = non_negative)]
    bmi: f64,
    /// Genetic risk score based on family history
    #[arg(long, default_value_t = 0.0, value_parser = non_negative)]
    pedigree: f64,
    /// Age at time of examination (years)
    #[arg(long, default_value_t = 0.0, value_parser = non_negative)]
    age: f64,
}

impl From<&PatientArgs> for InputRecord {
    fn from(args: &PatientArgs) -> Self {
        InputRecord::from_array([
            args.pregnancies,
            args.glucose,
            args.blood_pressure,
            args.skin_thickness,
            args.insulin,
            args.bmi,
            args.pedigree,
            args.age,
        ])
    }
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// CSV file whose headers include the eight model fields
    file: PathBuf,
    /// Where to write the scored rows
    #[arg(short, long, default_value = "predictions.csv")]
    output: PathBuf,
    /// Rows shown before scoring
    #[arg(long, default_value_t = 5)]
    preview: usize,
    #[arg(long, default_value = ",")]
    delimiter: String,
    /// Requests in flight at once (1 = sequential)
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

async fn single(client: &ApiClient, args: &PatientArgs) -> anyhow::Result<()> {
    let record = InputRecord::from(args);
    let result = client.score(&record).await?;
    print!("{}", render::single_result(&result));
    Ok(())
}

fn confirm(rows: usize) -> io::Result<bool> {
    print!("Predict batch of {} rows? [y/N] ", rows);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "o" | "oui"))
}

async fn batch(client: &ApiClient, args: &BatchArgs) -> anyhow::Result<()> {
    let delimiter = parse_delimiter(&args.delimiter)?;
    let table = open_table(&args.file, delimiter)?;

    println!("Preview:");
    let preview: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(args.preview)
        .map(|row| {
            table
                .headers
                .iter()
                .map(|h| row.get(h).unwrap_or("").to_string())
                .collect()
        })
        .collect();
    print!("{}", render::table(table.headers.as_slice(), &preview));

    if !args.yes && !confirm(table.rows.len())? {
        println!("Aborted.");
        return Ok(());
    }

    // Ctrl-C: plus aucune ligne n'est envoyée, celles en cours se terminent
    let stop = Arc::new(AtomicBool::new(false));
    let watcher = {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interruption demandée, arrêt après les lignes en cours");
                stop.store(true, Ordering::SeqCst);
            }
        })
    };

    println!("Processing {} rows...", table.rows.len());
    let report = run_batch(client, &table, args.concurrency, &stop, |p: &Progress| {
        eprint!("\r[{}/{}] row {}", p.done, p.total, p.row);
    })
    .await;
    watcher.abort();
    eprintln!();

    for failure in &report.failures {
        eprintln!("row {}: {}", failure.row, failure.reason);
    }
    if report.cancelled {
        eprintln!(
            "Stopped after {} of {} rows",
            report.processed(),
            report.total
        );
    }
    if !report.results.is_empty() {
        println!("Predictions Complete!");
        let cells: Vec<Vec<String>> = report.results.iter().map(result_cells).collect();
        print!("{}", render::table(export_headers().as_slice(), &cells));
    }

    export(&args.output, &report)?;
    info!(
        "{} / {} lignes exportées vers {}",
        report.results.len(),
        report.total,
        args.output.display()
    );
    println!(
        "{} of {} rows scored, results saved to {}",
        report.results.len(),
        report.total,
        args.output.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    let cli = Cli::parse();
    let client = ApiClient::new(cli.api_url.as_str(), Duration::from_secs(cli.timeout))?;
    info!("API: {}", client.url());

    match &cli.command {
        Command::Single(args) => single(&client, args).await,
        Command::Batch(args) => batch(&client, args).await,
    }
}
