use clap::Args;
use serde_json::Value;

use portfolio_core::monte_carlo::forecast::{self, ForecastInput};
use portfolio_core::portfolio::performance::covariance_matrix;
use portfolio_core::portfolio::returns::{log_returns, mean_returns};

use crate::input;

/// Arguments for the Monte Carlo value forecast
#[derive(Args)]
pub struct ForecastArgs {
    /// Path to CSV/JSON file with a dated price table
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated relative weights, one per analysed symbol (default: equal)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub weights: Option<Vec<f64>>,

    /// Forecast horizon in years
    #[arg(long, default_value = "5")]
    pub years: u32,

    /// Number of simulated paths
    #[arg(long, default_value = "1000")]
    pub simulations: u32,

    /// Starting portfolio value
    #[arg(long, default_value = "10000")]
    pub initial_investment: f64,

    /// PRNG seed
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Keep the full path grid in the output (large)
    #[arg(long)]
    pub full: bool,
}

pub fn run_forecast(args: ForecastArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table = input::prices::load_table_arg(&args.input)?;
    let (table, dropped) = table.drop_empty_columns();
    let returns = log_returns(&table)?;

    let weights = args
        .weights
        .unwrap_or_else(|| vec![1.0; returns.num_assets()]);
    let forecast_input = ForecastInput {
        weights,
        mean_returns: mean_returns(&returns),
        covariance_matrix: covariance_matrix(&returns)?,
        years: args.years,
        num_simulations: args.simulations,
        initial_investment: args.initial_investment,
        seed: args.seed,
    };
    let result = forecast::run_forecast(&forecast_input)?;

    let mut value = serde_json::to_value(result)?;
    if !args.full {
        // The grid is num_days x num_simulations; bands and final value
        // stats stay, so drop the bulk unless it was asked for.
        if let Some(result_obj) = value.get_mut("result").and_then(|v| v.as_object_mut()) {
            result_obj.remove("paths");
        }
    }
    if !dropped.is_empty() {
        if let Some(Value::Array(warnings)) = value.get_mut("warnings") {
            warnings.push(Value::String(format!(
                "Dropped symbols without any valid prices: {}",
                dropped.join(", ")
            )));
        }
    }
    Ok(value)
}
