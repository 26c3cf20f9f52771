//! Broome CLI binary.
//!
//! Runs market-model event studies for single events or whole event files.

mod integration;

use broome::data::{CachedPriceFetcher, YahooQuoteProvider};
use broome::output::{EventFile, EventReport, ExportFormat, Exporter, ResultTable, write_csv};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use integration::cache_manager::{open_cache, print_cache_info};
use integration::event_pipeline::{DEFAULT_CONCURRENCY, EventJob, run_events};
use integration::settings::StudyArgs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "broome")]
#[command(about = "Broome: market-model event studies", long_about = None)]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the study for every event in a CSV file
    Run {
        /// CSV file with `ticker` and `date` columns
        event_file: PathBuf,

        #[command(flatten)]
        study: StudyArgs,

        /// Output file for the event table with result columns
        #[arg(long, default_value = "event_study_result.csv")]
        output: PathBuf,

        /// Optional file for per-event details
        #[arg(long)]
        details: Option<PathBuf>,

        /// Format of the details file
        #[arg(long, value_enum, default_value = "csv")]
        format: DetailsFormat,

        /// Number of events processed concurrently
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Run the study for a single event
    Event {
        /// Stock symbol
        symbol: String,

        /// Event date (YYYY-MM-DD)
        date: NaiveDate,

        #[command(flatten)]
        study: StudyArgs,

        /// Print the report as Markdown
        #[arg(long)]
        markdown: bool,
    },

    /// Inspect or clear the price cache
    Cache {
        /// Show cache statistics
        #[arg(long)]
        stats: bool,

        /// Remove every cached price
        #[arg(long)]
        clear: bool,

        /// Remove cached prices for one symbol
        #[arg(long)]
        clear_symbol: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DetailsFormat {
    Csv,
    Json,
    PrettyJson,
}

impl From<DetailsFormat> for ExportFormat {
    fn from(format: DetailsFormat) -> Self {
        match format {
            DetailsFormat::Csv => Self::Csv,
            DetailsFormat::Json => Self::Json,
            DetailsFormat::PrettyJson => Self::PrettyJson,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run {
            event_file,
            study,
            output,
            details,
            format,
            concurrency,
        } => {
            run_event_file(
                &event_file,
                &study,
                &output,
                details.as_deref(),
                format.into(),
                concurrency,
            )
            .await?;
        }
        Commands::Event {
            symbol,
            date,
            study,
            markdown,
        } => {
            run_single_event(&symbol, date, &study, markdown).await?;
        }
        Commands::Cache {
            stats,
            clear,
            clear_symbol,
        } => {
            manage_cache(stats, clear, clear_symbol.as_deref())?;
        }
    }

    Ok(())
}

fn step(message: &str) -> std::io::Result<()> {
    print!("{message}");
    std::io::stdout().flush()
}

async fn run_event_file(
    event_file: &Path,
    args: &StudyArgs,
    output: &Path,
    details: Option<&Path>,
    format: ExportFormat,
    concurrency: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.study_config()?;
    let fetch_config = args.fetch_config();

    println!("\nEvent study against {}", args.stock_index);
    println!(
        "Window: ±{} {}s, distance {}, estimation period {}",
        config.window_size, config.mode, config.window_distance, config.estimation_period
    );

    step("\n[1/3] Reading event file...")?;
    let events = EventFile::read_csv(event_file)?;
    println!(" ✓ ({} events)", events.len());
    if events.rejected() > 0 {
        println!("  {} rows could not be read and will be reported as failed", events.rejected());
    }

    let cache = open_cache(fetch_config.use_cache)?;
    if fetch_config.use_cache {
        print_cache_info(&cache)?;
        if fetch_config.force_refresh {
            println!("  Mode: Force refresh (re-fetching all data)");
        }
    } else {
        println!("  Cache: Disabled (fetching fresh data)");
    }
    let fetcher = CachedPriceFetcher::new(YahooQuoteProvider::new()?, cache, fetch_config);

    println!("\n[2/3] Running event studies...");
    let pb = ProgressBar::new(events.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );

    let jobs = events
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| EventJob {
            index,
            ticker: record.ticker.clone(),
            date: record.date.clone(),
        })
        .collect();
    let outcomes = run_events(
        &fetcher,
        jobs,
        &args.stock_index,
        &config,
        concurrency,
        Some(&pb),
    )
    .await;
    pb.finish_with_message("done");

    step("\n[3/3] Writing results...")?;
    let mut table = ResultTable::new(config.window_size);
    for outcome in &outcomes {
        table.push(outcome.window());
    }
    let mut joined = table.join_events(events.frame())?;
    write_csv(&mut joined, output)?;

    if let Some(path) = details {
        let exports: Vec<_> = outcomes
            .iter()
            .map(|o| o.to_export(&args.stock_index))
            .collect();
        exports.export_to_file(path, format)?;
    }
    println!(" ✓");

    let computed = outcomes.iter().filter(|o| o.window().is_some()).count();
    let failed = outcomes
        .iter()
        .filter(|o| o.result.as_ref().is_err_and(|e| !e.is_no_result()))
        .count();
    info!(
        events = outcomes.len(),
        computed,
        complete = table.filled(),
        failed,
        "Event study finished"
    );

    println!("\nSummary:");
    println!("  Events:            {}", outcomes.len());
    println!("  Complete windows:  {}", table.filled());
    println!("  Partial windows:   {}", computed - table.filled());
    println!("  No result:         {}", outcomes.len() - computed - failed);
    println!("  Failed:            {}", failed);
    println!("\nResults written to {}", output.display());
    if let Some(path) = details {
        println!("Details written to {}", path.display());
    }

    Ok(())
}

async fn run_single_event(
    symbol: &str,
    date: NaiveDate,
    args: &StudyArgs,
    markdown: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let symbol = symbol.to_uppercase();
    let config = args.study_config()?;
    let fetch_config = args.fetch_config();

    let cache = open_cache(fetch_config.use_cache)?;
    let fetcher = CachedPriceFetcher::new(YahooQuoteProvider::new()?, cache, fetch_config);

    let job = EventJob {
        index: 0,
        ticker: symbol,
        date: Ok(date),
    };
    let outcomes = run_events(&fetcher, vec![job], &args.stock_index, &config, 1, None).await;

    for outcome in &outcomes {
        let report = EventReport::new(outcome.to_export(&args.stock_index));
        if markdown {
            println!("{}", report.to_markdown());
        } else {
            println!("{report}");
        }
    }

    Ok(())
}

fn manage_cache(
    stats: bool,
    clear: bool,
    clear_symbol: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cache = open_cache(true)?;

    if clear {
        cache.clear_all()?;
        println!("Cleared all cached prices");
    } else if let Some(symbol) = clear_symbol {
        let symbol = symbol.to_uppercase();
        cache.clear_symbol(&symbol)?;
        println!("Cleared cached prices for {symbol}");
    }

    if stats || (!clear && clear_symbol.is_none()) {
        println!("Price cache:");
        print_cache_info(&cache)?;
    }

    Ok(())
}
