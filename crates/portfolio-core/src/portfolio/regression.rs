use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;

use crate::error::PortfolioError;
use crate::portfolio::returns::ReturnSeries;
use crate::types::{with_metadata, ComputationOutput, TRADING_DAYS_PER_YEAR};
use crate::PortfolioResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for the benchmark regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionInput {
    /// Daily portfolio log returns.
    pub portfolio: ReturnSeries,
    /// Daily benchmark log returns.
    pub benchmark: ReturnSeries,
    /// Annual risk-free rate (0.045 = 4.5%).
    #[serde(default)]
    pub risk_free_rate: f64,
}

/// Output of the benchmark regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionOutput {
    /// Portfolio sensitivity to benchmark moves.
    pub beta: f64,
    /// Annualised excess return over the CAPM expectation.
    pub jensens_alpha: f64,
    pub portfolio_annualised_return: f64,
    pub benchmark_annualised_return: f64,
    /// Number of dates shared by both series.
    pub aligned_observations: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Beta and Jensen's alpha of a portfolio against a benchmark.
///
/// Both series are intersected on their dates first; observations present
/// in only one series are dropped and reported as a warning. Annualised
/// returns are computed over the aligned window so that beta and alpha
/// describe the same sample.
pub fn calculate_benchmark_regression(
    input: &RegressionInput,
) -> PortfolioResult<ComputationOutput<RegressionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    check_series(&input.portfolio, "portfolio")?;
    check_series(&input.benchmark, "benchmark")?;
    if !input.risk_free_rate.is_finite() {
        return Err(PortfolioError::InvalidInput {
            field: "risk_free_rate".into(),
            reason: "Must be finite".into(),
        });
    }

    let (p, b) = align(&input.portfolio, &input.benchmark);
    let aligned = p.len();
    let dropped = input.portfolio.values.len() + input.benchmark.values.len() - 2 * aligned;
    if dropped > 0 {
        warnings.push(format!(
            "{} observations dropped by date alignment",
            dropped
        ));
    }

    let beta = beta_aligned(&p, &b)?;
    let portfolio_annualised_return =
        p.iter().sum::<f64>() / aligned as f64 * TRADING_DAYS_PER_YEAR;
    let benchmark_annualised_return =
        b.iter().sum::<f64>() / aligned as f64 * TRADING_DAYS_PER_YEAR;
    let alpha = jensens_alpha(
        portfolio_annualised_return,
        benchmark_annualised_return,
        beta,
        input.risk_free_rate,
    );

    let output = RegressionOutput {
        beta,
        jensens_alpha: alpha,
        portfolio_annualised_return,
        benchmark_annualised_return,
        aligned_observations: aligned,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "CAPM Single-Factor Regression (beta, Jensen's alpha)",
        &serde_json::json!({
            "aligned_observations": aligned,
            "risk_free_rate": input.risk_free_rate,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Beta of a portfolio series against a benchmark series.
///
/// Dates must be strictly increasing in both series; only shared dates
/// enter the regression.
pub fn beta(portfolio: &ReturnSeries, benchmark: &ReturnSeries) -> PortfolioResult<f64> {
    check_series(portfolio, "portfolio")?;
    check_series(benchmark, "benchmark")?;
    let (p, b) = align(portfolio, benchmark);
    beta_aligned(&p, &b)
}

/// Jensen's alpha from annualised returns: `Rp - [rf + beta * (Rm - rf)]`.
pub fn jensens_alpha(
    portfolio_return: f64,
    benchmark_return: f64,
    beta: f64,
    risk_free_rate: f64,
) -> f64 {
    portfolio_return - (risk_free_rate + beta * (benchmark_return - risk_free_rate))
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn check_series(series: &ReturnSeries, context: &str) -> PortfolioResult<()> {
    if series.dates.len() != series.values.len() {
        return Err(PortfolioError::DimensionMismatch {
            context: format!("{} series", context),
            expected: series.dates.len(),
            actual: series.values.len(),
        });
    }
    Ok(())
}

/// Merge-join on the date axis. Both inputs are strictly increasing.
fn align(portfolio: &ReturnSeries, benchmark: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
    let mut p = Vec::new();
    let mut b = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < portfolio.dates.len() && j < benchmark.dates.len() {
        match portfolio.dates[i].cmp(&benchmark.dates[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                p.push(portfolio.values[i]);
                b.push(benchmark.values[j]);
                i += 1;
                j += 1;
            }
        }
    }
    (p, b)
}

/// Sample beta: `cov(p, b) / var(b)` with the n-1 denominator.
fn beta_aligned(portfolio: &[f64], benchmark: &[f64]) -> PortfolioResult<f64> {
    let n = portfolio.len();
    if n < 2 {
        return Err(PortfolioError::InsufficientData(
            "At least 2 overlapping observations required for beta".into(),
        ));
    }
    let denom = (n - 1) as f64;
    let mean_p = portfolio.iter().sum::<f64>() / n as f64;
    let mean_b = benchmark.iter().sum::<f64>() / n as f64;

    let covariance: f64 = portfolio
        .iter()
        .zip(benchmark.iter())
        .map(|(p, b)| (p - mean_p) * (b - mean_b))
        .sum::<f64>()
        / denom;
    let variance: f64 = benchmark
        .iter()
        .map(|b| (b - mean_b) * (b - mean_b))
        .sum::<f64>()
        / denom;

    if variance == 0.0 {
        return Err(PortfolioError::DegenerateVariance {
            context: "beta: benchmark variance is zero".into(),
        });
    }
    Ok(covariance / variance)
}
