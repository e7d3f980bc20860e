use clap::Args;
use serde::Serialize;
use serde_json::Value;

use portfolio_core::market::prices::PriceTable;
use portfolio_core::portfolio::performance::{calculate_portfolio_performance, PerformanceInput};
use portfolio_core::portfolio::regression::{calculate_benchmark_regression, RegressionInput};
use portfolio_core::portfolio::returns::{log_returns, portfolio_series};
use portfolio_core::ComputationOutput;

use crate::input;

/// Maximum symbols per run.
const MAX_SYMBOLS: usize = 50;

/// Arguments for portfolio analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to CSV/JSON file with a dated price table
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated relative weights, one per analysed symbol (default: equal)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub weights: Option<Vec<f64>>,

    /// Annual risk-free rate
    #[arg(long, default_value = "0.045")]
    pub risk_free_rate: f64,

    /// Symbol column to regress against instead of holding
    #[arg(long)]
    pub benchmark: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalyzeReport {
    symbols: Vec<String>,
    weights: Vec<f64>,
    observations: usize,
    annualised_return: f64,
    annualised_volatility: f64,
    sharpe_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    benchmark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    beta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jensens_alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aligned_observations: Option<usize>,
    mean_daily_returns: Vec<f64>,
    covariance_matrix: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_matrix: Option<Vec<Vec<f64>>>,
    /// Growth of one invested unit per return date.
    portfolio_cumulative: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    benchmark_cumulative: Option<Vec<f64>>,
    dropped_symbols: Vec<String>,
    warnings: Vec<String>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table = input::prices::load_table_arg(&args.input)?;
    if table.symbols.len() > MAX_SYMBOLS {
        return Err(format!(
            "At most {} symbols per run, got {}",
            MAX_SYMBOLS,
            table.symbols.len()
        )
        .into());
    }

    let (holdings, benchmark_table) = match &args.benchmark {
        Some(name) => {
            let (holdings, bench) = split_benchmark(table, name)?;
            (holdings, Some(bench))
        }
        None => (table, None),
    };

    let (holdings, dropped) = holdings.drop_empty_columns();
    let mut warnings: Vec<String> = Vec::new();
    if !dropped.is_empty() {
        warnings.push(format!(
            "Dropped symbols without any valid prices: {}",
            dropped.join(", ")
        ));
    }
    check_weight_count(args.weights.as_deref(), &holdings.symbols, &dropped)?;

    let returns = log_returns(&holdings)?;
    let perf_input = PerformanceInput {
        returns: returns.clone(),
        weights: args.weights.clone(),
        risk_free_rate: args.risk_free_rate,
    };
    let ComputationOutput {
        result: perf,
        warnings: perf_warnings,
        ..
    } = calculate_portfolio_performance(&perf_input)?;
    warnings.extend(perf_warnings);

    let series = portfolio_series(&returns, &perf.weights)?;
    let portfolio_cumulative = series.cumulative().values;

    let mut benchmark = None;
    let mut beta = None;
    let mut jensens_alpha = None;
    let mut aligned_observations = None;
    let mut benchmark_cumulative = None;
    if let Some(bench_table) = benchmark_table {
        let bench_returns = log_returns(&bench_table)?;
        let bench_series = portfolio_series(&bench_returns, &[1.0])?;

        let ComputationOutput {
            result: regression,
            warnings: regression_warnings,
            ..
        } = calculate_benchmark_regression(&RegressionInput {
            portfolio: series.clone(),
            benchmark: bench_series.clone(),
            risk_free_rate: args.risk_free_rate,
        })?;
        warnings.extend(regression_warnings);

        benchmark = Some(bench_table.symbols[0].clone());
        beta = Some(regression.beta);
        jensens_alpha = Some(regression.jensens_alpha);
        aligned_observations = Some(regression.aligned_observations);
        benchmark_cumulative = Some(bench_series.cumulative().values);
    }

    let report = AnalyzeReport {
        symbols: holdings.symbols,
        weights: perf.weights,
        observations: perf.observations,
        annualised_return: perf.annualised_return,
        annualised_volatility: perf.annualised_volatility,
        sharpe_ratio: perf.sharpe_ratio,
        benchmark,
        beta,
        jensens_alpha,
        aligned_observations,
        mean_daily_returns: perf.mean_daily_returns,
        covariance_matrix: perf.covariance_matrix,
        correlation_matrix: perf.correlation_matrix,
        portfolio_cumulative,
        benchmark_cumulative,
        dropped_symbols: dropped,
        warnings,
    };

    Ok(serde_json::to_value(report)?)
}

/// Pull one symbol column out of the table to serve as the benchmark.
fn split_benchmark(
    table: PriceTable,
    name: &str,
) -> Result<(PriceTable, PriceTable), Box<dyn std::error::Error>> {
    let idx = table
        .symbols
        .iter()
        .position(|s| s == name)
        .ok_or_else(|| format!("Benchmark '{}' not found in the price table", name))?;

    let mut holdings_symbols = table.symbols;
    let bench_symbol = holdings_symbols.remove(idx);
    if holdings_symbols.is_empty() {
        return Err("No holdings remain after splitting out the benchmark".into());
    }

    let mut holdings_prices = Vec::with_capacity(table.prices.len());
    let mut bench_prices = Vec::with_capacity(table.prices.len());
    for mut row in table.prices {
        let bench_cell = row.remove(idx);
        bench_prices.push(vec![bench_cell]);
        holdings_prices.push(row);
    }

    let holdings = PriceTable {
        dates: table.dates.clone(),
        symbols: holdings_symbols,
        prices: holdings_prices,
    };
    let benchmark = PriceTable {
        dates: table.dates,
        symbols: vec![bench_symbol],
        prices: bench_prices,
    };
    Ok((holdings, benchmark))
}

/// Validate a user-supplied weight vector against the post-drop universe.
/// Dropped columns change the expected length, so the error names them.
fn check_weight_count(
    weights: Option<&[f64]>,
    symbols: &[String],
    dropped: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(w) = weights {
        if w.len() != symbols.len() {
            let mut msg = format!(
                "Expected {} weights (one per analysed symbol), got {}",
                symbols.len(),
                w.len()
            );
            if !dropped.is_empty() {
                msg.push_str(&format!(
                    "; symbols dropped without any valid prices: {}",
                    dropped.join(", ")
                ));
            }
            return Err(msg.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_weight_count_accepts_absent_or_matching_weights() {
        let universe = symbols(&["AAA", "BBB"]);
        assert!(check_weight_count(None, &universe, &[]).is_ok());
        assert!(check_weight_count(Some([0.7, 0.3].as_slice()), &universe, &[]).is_ok());
    }

    #[test]
    fn test_weight_count_mismatch_names_dropped_symbols() {
        let universe = symbols(&["AAA", "BBB"]);
        let dropped = symbols(&["DEAD"]);
        let err = check_weight_count(Some([0.5, 0.3, 0.2].as_slice()), &universe, &dropped)
            .unwrap_err()
            .to_string();
        assert!(err.contains("Expected 2 weights"), "unexpected error: {}", err);
        assert!(err.contains("got 3"), "unexpected error: {}", err);
        assert!(err.contains("DEAD"), "unexpected error: {}", err);
    }

    #[test]
    fn test_weight_count_mismatch_without_drops_stays_plain() {
        let universe = symbols(&["AAA"]);
        let err = check_weight_count(Some([0.5, 0.5].as_slice()), &universe, &[])
            .unwrap_err()
            .to_string();
        assert!(err.contains("got 2"), "unexpected error: {}", err);
        assert!(!err.contains("dropped"), "unexpected error: {}", err);
    }
}
