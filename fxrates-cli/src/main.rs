//! FX Rates CLI: update, publish, and status commands.
//!
//! Commands:
//! - `update`: fetch ECB reference rates since the last stored date and merge them in
//! - `publish`: build one chart per currency and write or POST them
//! - `status`: report the stored dataset and its metadata sidecar
//!
//! `update` exits 0 when data was written, 1 when there was nothing new, 2 on
//! any fatal error.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fxrates_core::data::{EcbSource, RateStore};
use fxrates_core::CurrencySet;
use fxrates_runner::{
    publish_table, run_update, FxConfig, HttpSink, JsonFileSink, UpdateOutcome, UpdateRequest,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fxrates",
    about = "FX Rates: incremental ECB euro reference rate dataset"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch new rates and merge them into the stored dataset.
    Update {
        /// Initial start date (YYYY-MM-DD). Overrides the config file. Later runs
        /// resume from the last stored date.
        #[arg(long)]
        start_date: Option<String>,

        /// Data directory. Overrides the config file and DATA_DIR.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Comma-separated currency codes (e.g., USD,JPY). Defaults to all.
        #[arg(long, value_delimiter = ',')]
        currencies: Vec<String>,
    },
    /// Build charts from the stored dataset and publish them.
    Publish {
        /// Data directory. Overrides the config file and DATA_DIR.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the chart array to this file instead of the HTTP endpoint.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Report the stored dataset.
    Status {
        /// Data directory. Overrides the config file and DATA_DIR.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Update {
            start_date,
            data_dir,
            config,
            currencies,
        } => run_update_cmd(start_date, data_dir, config, currencies),
        Commands::Publish {
            data_dir,
            config,
            out,
        } => run_publish(data_dir, config, out).map(|()| ExitCode::SUCCESS),
        Commands::Status { data_dir, config } => {
            run_status(data_dir, config).map(|()| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<FxConfig> {
    let mut config = FxConfig::load(path)?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

fn run_update_cmd(
    start_date: Option<String>,
    data_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    currencies: Vec<String>,
) -> Result<ExitCode> {
    let config = load_config(config_path.as_deref(), data_dir)?;

    let start_date = start_date
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--start-date must be YYYY-MM-DD")?
        .or(config.initial_start_date);
    if start_date.is_none() {
        bail!("no start date: pass --start-date or set initial_start_date in the config");
    }

    let currencies = if currencies.is_empty() {
        config.currency_set()
    } else {
        CurrencySet::parse(&currencies)?
    };
    if currencies.is_empty() {
        bail!("no currencies selected");
    }

    let request = UpdateRequest {
        currencies,
        initial_start_date: start_date,
        retry: config.retry.to_policy()?,
    };
    let source = EcbSource::new(&config.source.base_url, config.source.timeout())?;
    let store = RateStore::new(&config.data_dir);

    match run_update(&request, &source, &store)? {
        UpdateOutcome::Written(summary) => {
            println!(
                "Saved {} rows x {} currencies to {}",
                summary.rows,
                summary.columns,
                summary.path.display()
            );
            if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
                println!("Date range: {first} to {last}");
            }
            println!(
                "New dates: {}, revised values: {}",
                summary.new_dates, summary.revised_values
            );
            print_failures(&summary.failed_currencies);
            Ok(ExitCode::SUCCESS)
        }
        UpdateOutcome::NoNewData {
            start_date,
            failed_currencies,
        } => {
            println!("No new data since {start_date}");
            print_failures(&failed_currencies);
            Ok(ExitCode::from(1))
        }
    }
}

fn print_failures(failed: &[fxrates_core::Currency]) {
    if failed.is_empty() {
        return;
    }
    let codes: Vec<&str> = failed.iter().map(|c| c.code()).collect();
    println!("Failed currencies: {}", codes.join(", "));
}

fn run_publish(
    data_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_deref(), data_dir)?;
    let store = RateStore::new(&config.data_dir);
    let Some(table) = store.load()? else {
        bail!("no dataset at {}", store.rates_path().display());
    };

    let count = match out {
        Some(path) => {
            let sink = JsonFileSink::new(&path);
            let count = publish_table(&table, &sink)?;
            println!("Wrote {count} charts to {}", path.display());
            count
        }
        None => {
            let Some(endpoint) = config.publish.endpoint.as_deref() else {
                bail!("no publish endpoint configured; set [publish].endpoint or pass --out");
            };
            let key_var = &config.publish.api_key_env;
            let api_key = std::env::var(key_var)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .with_context(|| format!("{key_var} is not set"))?;
            let sink = HttpSink::new(endpoint, api_key, config.source.timeout())?;
            let count = publish_table(&table, &sink)?;
            println!("Published {count} charts to {endpoint}");
            count
        }
    };

    if count == 0 {
        println!("Dataset has no currency columns; nothing to chart");
    }
    Ok(())
}

fn run_status(data_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref(), data_dir)?;
    let store = RateStore::new(&config.data_dir);

    let Some(table) = store.load()? else {
        println!("No dataset at {}", store.rates_path().display());
        return Ok(());
    };

    println!("Dataset: {}", store.rates_path().display());
    println!("Rows: {}", table.len());
    println!("Currencies: {}", table.column_count());
    match (table.first_date(), table.last_date()) {
        (Some(first), Some(last)) => println!("Date range: {first} to {last}"),
        _ => println!("Date range: (empty)"),
    }

    match store.read_meta() {
        Some(meta) => {
            let intact = store.verify()?;
            println!("Written at: {}", meta.written_at.format("%Y-%m-%d %H:%M:%S"));
            println!(
                "Hash: {} ({})",
                meta.data_hash,
                if intact { "ok" } else { "MISMATCH" }
            );
        }
        None => println!("Metadata: (missing or unreadable)"),
    }

    println!();
    println!("{:<6} {:<40} {:>8} {:>12}", "Code", "Name", "Points", "Latest");
    println!("{}", "-".repeat(69));
    for currency in table.columns() {
        let column = table.column(*currency);
        let latest = column
            .last()
            .map(|(date, value)| format!("{value} @ {date}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<6} {:<40} {:>8} {:>12}",
            currency.code(),
            currency.name(),
            column.len(),
            latest
        );
    }

    Ok(())
}
