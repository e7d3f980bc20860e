mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analyze::AnalyzeArgs;
use commands::esg::EsgArgs;
use commands::forecast::ForecastArgs;
use commands::frontier::FrontierArgs;

/// Portfolio risk/return analytics over daily price histories
#[derive(Parser)]
#[command(
    name = "pfa",
    version,
    about = "Portfolio risk/return analytics over daily price histories",
    long_about = "A CLI for portfolio analytics over daily price tables. \
                  Derives log returns and annualised performance, regresses a \
                  portfolio against a benchmark, samples a random-search \
                  frontier, forecasts portfolio value with Monte Carlo paths, \
                  and produces mock ESG scores."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a weighted portfolio over a price table
    Analyze(AnalyzeArgs),
    /// Sample random portfolios on the risk/return plane
    Frontier(FrontierArgs),
    /// Forecast portfolio value with Monte Carlo paths
    Forecast(ForecastArgs),
    /// Mock ESG scores for a ticker list
    Esg(EsgArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analyze::run_analyze(args),
        Commands::Frontier(args) => commands::frontier::run_frontier(args),
        Commands::Forecast(args) => commands::forecast::run_forecast(args),
        Commands::Esg(args) => commands::esg::run_esg(args),
        Commands::Version => {
            println!("pfa {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
