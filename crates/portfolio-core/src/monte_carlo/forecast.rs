use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::time::Instant;

use crate::error::PortfolioError;
use crate::portfolio::performance::validate_covariance_matrix;
use crate::portfolio::returns::normalize_weights;
use crate::types::{with_metadata, ComputationOutput, TRADING_DAYS_PER_YEAR};
use crate::PortfolioResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for the portfolio value forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastInput {
    /// Relative weights, one per asset, normalised before use.
    pub weights: Vec<f64>,
    /// Mean daily log return per asset.
    pub mean_returns: Vec<f64>,
    /// Daily covariance matrix (not annualised).
    pub covariance_matrix: Vec<Vec<f64>>,
    /// Forecast horizon in years of 252 trading days.
    #[serde(default = "default_years")]
    pub years: u32,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Starting portfolio value.
    #[serde(default = "default_initial_investment")]
    pub initial_investment: f64,
    /// PRNG seed. Same seed, same paths.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_years() -> u32 {
    5
}

fn default_num_simulations() -> u32 {
    1_000
}

fn default_initial_investment() -> f64 {
    10_000.0
}

fn default_seed() -> u64 {
    42
}

/// Per-day percentile bands across all paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastBands {
    pub median: Vec<f64>,
    pub p05: Vec<f64>,
    pub p95: Vec<f64>,
}

/// Distribution of terminal portfolio values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FinalValueStats {
    pub median: f64,
    pub p05: f64,
    pub p95: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Output of the portfolio value forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastOutput {
    /// Total rows in `paths`, including the initial row.
    pub num_days: usize,
    pub num_simulations: u32,
    /// Portfolio daily drift, `sum(w * mu)`.
    pub daily_drift: f64,
    /// Portfolio daily volatility, `sqrt(w' * cov * w)`.
    pub daily_volatility: f64,
    /// Day-major value grid: `paths[t][s]` is path `s` on day `t`.
    /// Row 0 holds the initial investment for every path.
    pub paths: Vec<Vec<f64>>,
    pub bands: ForecastBands,
    pub final_values: FinalValueStats,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Geometric Brownian Motion forecast of portfolio value.
///
/// Each path evolves as `V_t = V_{t-1} * exp((mu - sigma^2/2) + sigma * Z)`
/// with daily portfolio moments derived from the weighted asset moments.
/// Shocks are drawn day by day, one standard normal per path within each
/// day, so the stream consumed by a given grid shape is fixed.
pub fn run_forecast(input: &ForecastInput) -> PortfolioResult<ComputationOutput<ForecastOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut rng = StdRng::seed_from_u64(input.seed);
    let output = run_forecast_with_rng(input, &mut rng)?;

    if input.num_simulations < 100 {
        warnings.push(format!(
            "Only {} simulations; percentile bands will be noisy",
            input.num_simulations
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Geometric Brownian Motion Portfolio Forecast",
        &serde_json::json!({
            "years": input.years,
            "num_days": output.num_days,
            "num_simulations": input.num_simulations,
            "initial_investment": input.initial_investment,
            "seed": input.seed,
            "trading_days_per_year": TRADING_DAYS_PER_YEAR,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Forecast against a caller-owned PRNG.
pub fn run_forecast_with_rng(
    input: &ForecastInput,
    rng: &mut impl Rng,
) -> PortfolioResult<ForecastOutput> {
    let weights = normalize_weights(&input.weights)?;
    let n = weights.len();
    if input.mean_returns.len() != n {
        return Err(PortfolioError::DimensionMismatch {
            context: "mean_returns".into(),
            expected: n,
            actual: input.mean_returns.len(),
        });
    }
    if input.mean_returns.iter().any(|m| !m.is_finite()) {
        return Err(PortfolioError::InvalidInput {
            field: "mean_returns".into(),
            reason: "All entries must be finite".into(),
        });
    }
    validate_covariance_matrix(&input.covariance_matrix, n)?;
    if input.years == 0 {
        return Err(PortfolioError::InvalidInput {
            field: "years".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if input.num_simulations == 0 {
        return Err(PortfolioError::InvalidInput {
            field: "num_simulations".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if !(input.initial_investment.is_finite() && input.initial_investment > 0.0) {
        return Err(PortfolioError::InvalidInput {
            field: "initial_investment".into(),
            reason: "Must be a positive finite value".into(),
        });
    }

    let daily_drift: f64 = weights
        .iter()
        .zip(input.mean_returns.iter())
        .map(|(w, m)| w * m)
        .sum();
    let mut variance = 0.0;
    for i in 0..n {
        for j in 0..n {
            variance += weights[i] * input.covariance_matrix[i][j] * weights[j];
        }
    }
    let daily_volatility = variance.max(0.0).sqrt();

    let standard_normal = Normal::new(0.0, 1.0).map_err(|e| PortfolioError::InvalidInput {
        field: "shock_distribution".into(),
        reason: e.to_string(),
    })?;

    let num_days = (input.years as f64 * TRADING_DAYS_PER_YEAR) as usize;
    let num_paths = input.num_simulations as usize;
    let drift_term = daily_drift - 0.5 * daily_volatility * daily_volatility;

    let mut paths = Vec::with_capacity(num_days);
    paths.push(vec![input.initial_investment; num_paths]);
    for t in 1..num_days {
        let mut row = Vec::with_capacity(num_paths);
        for s in 0..num_paths {
            let shock: f64 = rng.sample(standard_normal);
            row.push(paths[t - 1][s] * (drift_term + daily_volatility * shock).exp());
        }
        paths.push(row);
    }

    let mut median = Vec::with_capacity(num_days);
    let mut p05 = Vec::with_capacity(num_days);
    let mut p95 = Vec::with_capacity(num_days);
    for row in &paths {
        let mut sorted = row.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        median.push(percentile_sorted(&sorted, 50.0));
        p05.push(percentile_sorted(&sorted, 5.0));
        p95.push(percentile_sorted(&sorted, 95.0));
    }

    let mut terminal = paths[num_days - 1].clone();
    terminal.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let final_values = FinalValueStats {
        median: percentile_sorted(&terminal, 50.0),
        p05: percentile_sorted(&terminal, 5.0),
        p95: percentile_sorted(&terminal, 95.0),
        mean: terminal.iter().sum::<f64>() / terminal.len() as f64,
        min: terminal[0],
        max: terminal[terminal.len() - 1],
    };

    Ok(ForecastOutput {
        num_days,
        num_simulations: input.num_simulations,
        daily_drift,
        daily_volatility,
        paths,
        bands: ForecastBands { median, p05, p95 },
        final_values,
    })
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Linear-interpolation percentile over a pre-sorted slice.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}
