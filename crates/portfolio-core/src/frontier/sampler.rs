use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::Uniform;
use std::time::Instant;

use crate::error::PortfolioError;
use crate::portfolio::performance::{portfolio_performance, validate_covariance_matrix};
use crate::portfolio::returns::normalize_weights;
use crate::types::{with_metadata, ComputationOutput};
use crate::PortfolioResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for frontier sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierInput {
    /// Mean daily log return per asset.
    pub mean_returns: Vec<f64>,
    /// Daily covariance matrix (not annualised).
    pub covariance_matrix: Vec<Vec<f64>>,
    /// Number of random portfolios to draw.
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,
    /// Annual risk-free rate (0.045 = 4.5%).
    #[serde(default)]
    pub risk_free_rate: f64,
    /// PRNG seed. Same seed, same frontier.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_sample_count() -> u32 {
    5_000
}

fn default_seed() -> u64 {
    42
}

/// One sampled portfolio on the risk/return plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierSample {
    /// Annualised expected return.
    pub expected_return: f64,
    /// Annualised volatility.
    pub risk: f64,
    pub sharpe_ratio: f64,
    pub weights: Vec<f64>,
}

/// Sampled frontier with the two headline portfolios marked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierOutput {
    /// Samples in draw order.
    pub samples: Vec<FrontierSample>,
    /// Index of the highest-Sharpe sample (first wins on ties).
    pub max_sharpe_index: usize,
    /// Index of the lowest-volatility sample (first wins on ties).
    pub min_volatility_index: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Random-search frontier: draws `sample_count` weight vectors uniformly
/// and evaluates each one at the given moments.
///
/// Each draw takes one Uniform(0, 1) variate per asset in asset order,
/// then normalises the vector to sum to 1. The output always contains
/// exactly `sample_count` samples in draw order.
pub fn sample_frontier(input: &FrontierInput) -> PortfolioResult<ComputationOutput<FrontierOutput>> {
    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(input.seed);
    let output = sample_frontier_with_rng(input, &mut rng)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Random-Search Frontier Sampling",
        &serde_json::json!({
            "n_assets": input.mean_returns.len(),
            "sample_count": input.sample_count,
            "risk_free_rate": input.risk_free_rate,
            "seed": input.seed,
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}

/// Frontier sampling against a caller-owned PRNG.
pub fn sample_frontier_with_rng(
    input: &FrontierInput,
    rng: &mut impl Rng,
) -> PortfolioResult<FrontierOutput> {
    let n = input.mean_returns.len();
    if n == 0 {
        return Err(PortfolioError::EmptyInput {
            context: "mean_returns".into(),
        });
    }
    if input.mean_returns.iter().any(|m| !m.is_finite()) {
        return Err(PortfolioError::InvalidInput {
            field: "mean_returns".into(),
            reason: "All entries must be finite".into(),
        });
    }
    validate_covariance_matrix(&input.covariance_matrix, n)?;
    if input.sample_count == 0 {
        return Err(PortfolioError::InvalidInput {
            field: "sample_count".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if !input.risk_free_rate.is_finite() {
        return Err(PortfolioError::InvalidInput {
            field: "risk_free_rate".into(),
            reason: "Must be finite".into(),
        });
    }

    let uniform = Uniform::new(0.0, 1.0).map_err(|e| PortfolioError::InvalidInput {
        field: "weight_distribution".into(),
        reason: e.to_string(),
    })?;

    let mut samples = Vec::with_capacity(input.sample_count as usize);
    for _ in 0..input.sample_count {
        let raw: Vec<f64> = (0..n).map(|_| rng.sample(uniform)).collect();
        let weights = normalize_weights(&raw)?;
        let triple = portfolio_performance(
            &weights,
            &input.mean_returns,
            &input.covariance_matrix,
            input.risk_free_rate,
        )?;
        samples.push(FrontierSample {
            expected_return: triple.annualised_return,
            risk: triple.annualised_volatility,
            sharpe_ratio: triple.sharpe_ratio,
            weights,
        });
    }

    let mut max_sharpe_index = 0;
    let mut min_volatility_index = 0;
    for (i, sample) in samples.iter().enumerate() {
        if sample.sharpe_ratio > samples[max_sharpe_index].sharpe_ratio {
            max_sharpe_index = i;
        }
        if sample.risk < samples[min_volatility_index].risk {
            min_volatility_index = i;
        }
    }

    Ok(FrontierOutput {
        samples,
        max_sharpe_index,
        min_volatility_index,
    })
}
