use clap::Args;
use serde_json::Value;

use portfolio_core::frontier::sampler::{self, FrontierInput};
use portfolio_core::portfolio::performance::covariance_matrix;
use portfolio_core::portfolio::returns::{log_returns, mean_returns};

use crate::input;

/// Arguments for frontier sampling
#[derive(Args)]
pub struct FrontierArgs {
    /// Path to CSV/JSON file with a dated price table
    #[arg(long)]
    pub input: Option<String>,

    /// Number of random portfolios to draw
    #[arg(long, default_value = "5000")]
    pub samples: u32,

    /// Annual risk-free rate
    #[arg(long, default_value = "0.045")]
    pub risk_free_rate: f64,

    /// PRNG seed
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

pub fn run_frontier(args: FrontierArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table = input::prices::load_table_arg(&args.input)?;
    let (table, dropped) = table.drop_empty_columns();
    let returns = log_returns(&table)?;

    let frontier_input = FrontierInput {
        mean_returns: mean_returns(&returns),
        covariance_matrix: covariance_matrix(&returns)?,
        sample_count: args.samples,
        risk_free_rate: args.risk_free_rate,
        seed: args.seed,
    };
    let result = sampler::sample_frontier(&frontier_input)?;

    let mut value = serde_json::to_value(result)?;
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
