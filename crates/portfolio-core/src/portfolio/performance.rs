use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PortfolioError;
use crate::portfolio::returns::{equal_weights, mean_returns, normalize_weights, ReturnMatrix};
use crate::types::{with_metadata, ComputationOutput, TRADING_DAYS_PER_YEAR};
use crate::PortfolioResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for the portfolio risk/return report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceInput {
    /// Daily log returns.
    pub returns: ReturnMatrix,
    /// Relative weights, one per column, normalised before use.
    /// Omitted means equal weights.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    /// Annual risk-free rate (0.045 = 4.5%).
    #[serde(default)]
    pub risk_free_rate: f64,
}

/// Annualised risk/return triple for one weight vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTriple {
    pub annualised_return: f64,
    pub annualised_volatility: f64,
    pub sharpe_ratio: f64,
}

/// Output of the portfolio risk/return report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceOutput {
    pub annualised_return: f64,
    pub annualised_volatility: f64,
    pub sharpe_ratio: f64,
    /// Normalised weights actually applied.
    pub weights: Vec<f64>,
    /// Mean daily log return per asset.
    pub mean_daily_returns: Vec<f64>,
    /// Daily sample covariance (not annualised).
    pub covariance_matrix: Vec<Vec<f64>>,
    /// Pairwise correlations; omitted when a column has zero variance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_matrix: Option<Vec<Vec<f64>>>,
    pub observations: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Full risk/return report for one weight vector over a return matrix.
///
/// Computes the daily sample covariance and correlation, then the
/// annualised performance triple. Weights are relative values normalised
/// to sum to 1; omitted weights mean an equal-weight portfolio.
pub fn calculate_portfolio_performance(
    input: &PerformanceInput,
) -> PortfolioResult<ComputationOutput<PerformanceOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let n = input.returns.num_assets();
    if n == 0 {
        return Err(PortfolioError::EmptyInput {
            context: "return matrix has no columns".into(),
        });
    }
    if !input.risk_free_rate.is_finite() {
        return Err(PortfolioError::InvalidInput {
            field: "risk_free_rate".into(),
            reason: "Must be finite".into(),
        });
    }

    let weights = match &input.weights {
        Some(raw) => {
            if raw.len() != n {
                return Err(PortfolioError::DimensionMismatch {
                    context: "weights".into(),
                    expected: n,
                    actual: raw.len(),
                });
            }
            normalize_weights(raw)?
        }
        None => equal_weights(n),
    };

    let mu = mean_returns(&input.returns);
    let cov = covariance_matrix(&input.returns)?;
    let triple = portfolio_performance(&weights, &mu, &cov, input.risk_free_rate)?;

    let correlation = match correlation_matrix(&cov) {
        Ok(corr) => Some(corr),
        Err(PortfolioError::DegenerateVariance { context }) => {
            warnings.push(format!("Correlation matrix omitted: {}", context));
            None
        }
        Err(e) => return Err(e),
    };

    if triple.annualised_volatility == 0.0 {
        warnings.push("Portfolio volatility is zero; Sharpe ratio reported as 0".into());
    }

    let output = PerformanceOutput {
        annualised_return: triple.annualised_return,
        annualised_volatility: triple.annualised_volatility,
        sharpe_ratio: triple.sharpe_ratio,
        weights,
        mean_daily_returns: mu,
        covariance_matrix: cov,
        correlation_matrix: correlation,
        observations: input.returns.num_rows(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annualised Portfolio Risk/Return (252 trading days)",
        &serde_json::json!({
            "n_assets": n,
            "observations": input.returns.num_rows(),
            "risk_free_rate": input.risk_free_rate,
            "equal_weights": input.weights.is_none(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Daily sample covariance matrix (n-1 denominator), no annualisation.
pub fn covariance_matrix(returns: &ReturnMatrix) -> PortfolioResult<Vec<Vec<f64>>> {
    let rows = returns.num_rows();
    if rows < 2 {
        return Err(PortfolioError::InsufficientData(
            "At least 2 return observations required for covariance".into(),
        ));
    }
    let n = returns.num_assets();
    let means = mean_returns(returns);
    let denom = (rows - 1) as f64;

    let mut cov = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let sum: f64 = returns
                .values
                .iter()
                .map(|row| (row[i] - means[i]) * (row[j] - means[j]))
                .sum();
            cov[i][j] = sum / denom;
            cov[j][i] = cov[i][j];
        }
    }
    Ok(cov)
}

/// Correlation matrix derived from a daily covariance matrix.
pub fn correlation_matrix(cov: &[Vec<f64>]) -> PortfolioResult<Vec<Vec<f64>>> {
    let n = cov.len();
    validate_covariance_matrix(cov, n)?;
    for (i, row) in cov.iter().enumerate() {
        if row[i] <= 0.0 {
            return Err(PortfolioError::DegenerateVariance {
                context: format!("correlation: column {} has zero variance", i),
            });
        }
    }

    let mut corr = vec![vec![0.0; n]; n];
    for i in 0..n {
        corr[i][i] = 1.0;
        for j in (i + 1)..n {
            let rho = cov[i][j] / (cov[i][i].sqrt() * cov[j][j].sqrt());
            corr[i][j] = rho;
            corr[j][i] = rho;
        }
    }
    Ok(corr)
}

/// Annualised performance triple for one weight vector.
///
/// Return is `sum(mean_returns * weights) * 252`; volatility is
/// `sqrt(w' * (cov * 252) * w)`; Sharpe falls back to 0 when volatility
/// is 0. Weight, mean, and covariance dimensions must agree exactly.
pub fn portfolio_performance(
    weights: &[f64],
    mean_returns: &[f64],
    cov: &[Vec<f64>],
    risk_free_rate: f64,
) -> PortfolioResult<PerformanceTriple> {
    let n = weights.len();
    if mean_returns.len() != n {
        return Err(PortfolioError::DimensionMismatch {
            context: "mean_returns".into(),
            expected: n,
            actual: mean_returns.len(),
        });
    }
    validate_covariance_matrix(cov, n)?;

    let annualised_return = vec_dot(mean_returns, weights) * TRADING_DAYS_PER_YEAR;
    // Float accumulation can leave a tiny negative variance on
    // near-singular matrices; clamp before the square root.
    let annual_variance = vec_dot(weights, &mat_vec_multiply(cov, weights)) * TRADING_DAYS_PER_YEAR;
    let annualised_volatility = annual_variance.max(0.0).sqrt();
    let sharpe_ratio = compute_sharpe(annualised_return, risk_free_rate, annualised_volatility);

    Ok(PerformanceTriple {
        annualised_return,
        annualised_volatility,
        sharpe_ratio,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate_covariance_matrix(cov: &[Vec<f64>], n: usize) -> PortfolioResult<()> {
    if cov.len() != n {
        return Err(PortfolioError::DimensionMismatch {
            context: "covariance_matrix rows".into(),
            expected: n,
            actual: cov.len(),
        });
    }
    for (i, row) in cov.iter().enumerate() {
        if row.len() != n {
            return Err(PortfolioError::DimensionMismatch {
                context: format!("covariance_matrix row {}", i),
                expected: n,
                actual: row.len(),
            });
        }
        for (j, val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(PortfolioError::InvalidInput {
                    field: "covariance_matrix".into(),
                    reason: format!("Entry [{},{}] is not finite", i, j),
                });
            }
        }
    }
    let tolerance = 1e-9;
    for i in 0..n {
        for j in (i + 1)..n {
            if (cov[i][j] - cov[j][i]).abs() > tolerance {
                return Err(PortfolioError::InvalidInput {
                    field: "covariance_matrix".into(),
                    reason: format!(
                        "Not symmetric: [{},{}]={} != [{},{}]={}",
                        i, j, cov[i][j], j, i, cov[j][i]
                    ),
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Math helpers
// ---------------------------------------------------------------------------

/// Sharpe ratio with the zero-volatility guard.
fn compute_sharpe(ret: f64, rf: f64, vol: f64) -> f64 {
    if vol == 0.0 {
        0.0
    } else {
        (ret - rf) / vol
    }
}

/// Matrix-vector multiplication.
fn mat_vec_multiply(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Dot product.
fn vec_dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::prices::PriceTable;
    use crate::portfolio::returns::log_returns;
    use chrono::NaiveDate;

    fn sample_returns() -> ReturnMatrix {
        let table = PriceTable {
            dates: (1..=4)
                .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
                .collect(),
            symbols: vec!["AAA".into(), "BBB".into()],
            prices: vec![
                vec![Some(100.0), Some(50.0)],
                vec![Some(102.0), Some(49.0)],
                vec![Some(101.0), Some(51.0)],
                vec![Some(105.0), Some(52.0)],
            ],
        };
        log_returns(&table).unwrap()
    }

    #[test]
    fn test_covariance_matches_manual_computation() {
        let returns = sample_returns();
        let cov = covariance_matrix(&returns).unwrap();

        let col = |c: usize| -> Vec<f64> { returns.values.iter().map(|r| r[c]).collect() };
        let a = col(0);
        let b = col(1);
        let mean_a: f64 = a.iter().sum::<f64>() / 3.0;
        let mean_b: f64 = b.iter().sum::<f64>() / 3.0;
        let expected_ab: f64 = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - mean_a) * (y - mean_b))
            .sum::<f64>()
            / 2.0;

        assert!((cov[0][1] - expected_ab).abs() < 1e-15);
        assert_eq!(cov[0][1], cov[1][0]);
        assert!(cov[0][0] > 0.0);
        assert!(cov[1][1] > 0.0);
    }

    #[test]
    fn test_covariance_requires_two_observations() {
        let mut returns = sample_returns();
        returns.values.truncate(1);
        returns.dates.truncate(1);
        assert!(matches!(
            covariance_matrix(&returns),
            Err(PortfolioError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_equal_weight_performance_manual_recomputation() {
        let returns = sample_returns();
        let mu = mean_returns(&returns);
        let cov = covariance_matrix(&returns).unwrap();
        let w = vec![0.5, 0.5];

        let triple = portfolio_performance(&w, &mu, &cov, 0.0).unwrap();

        let expected_return = (mu[0] * 0.5 + mu[1] * 0.5) * 252.0;
        let port_var = 0.25 * cov[0][0] + 0.25 * cov[1][1] + 2.0 * 0.25 * cov[0][1];
        let expected_vol = (port_var * 252.0).sqrt();

        assert!((triple.annualised_return - expected_return).abs() < 1e-9);
        assert!((triple.annualised_volatility - expected_vol).abs() < 1e-9);
        assert!((triple.sharpe_ratio - expected_return / expected_vol).abs() < 1e-9);
    }

    #[test]
    fn test_sharpe_sign_matches_excess_return_sign() {
        let returns = sample_returns();
        let mu = mean_returns(&returns);
        let cov = covariance_matrix(&returns).unwrap();
        let triple = portfolio_performance(&[0.5, 0.5], &mu, &cov, 0.0).unwrap();
        assert_eq!(
            triple.sharpe_ratio > 0.0,
            triple.annualised_return > 0.0
        );
    }

    #[test]
    fn test_sharpe_zero_when_volatility_zero() {
        // Constant returns, single asset: variance is exactly 0
        let triple = portfolio_performance(&[1.0], &[0.001], &[vec![0.0]], 0.0).unwrap();
        assert_eq!(triple.annualised_volatility, 0.0);
        assert_eq!(triple.sharpe_ratio, 0.0);
        assert!(triple.annualised_return > 0.0);
    }

    #[test]
    fn test_weight_dimension_mismatch_is_fatal() {
        let returns = sample_returns();
        let mu = mean_returns(&returns);
        let cov = covariance_matrix(&returns).unwrap();
        assert!(matches!(
            portfolio_performance(&[1.0], &mu, &cov, 0.0),
            Err(PortfolioError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_asymmetric_covariance_rejected() {
        let cov = vec![vec![1.0, 0.5], vec![0.3, 1.0]];
        assert!(portfolio_performance(&[0.5, 0.5], &[0.1, 0.1], &cov, 0.0).is_err());
    }

    #[test]
    fn test_nan_covariance_rejected() {
        let cov = vec![vec![1.0, f64::NAN], vec![f64::NAN, 1.0]];
        assert!(validate_covariance_matrix(&cov, 2).is_err());
    }

    #[test]
    fn test_correlation_unit_diagonal_and_bounds() {
        let returns = sample_returns();
        let cov = covariance_matrix(&returns).unwrap();
        let corr = correlation_matrix(&cov).unwrap();
        assert_eq!(corr[0][0], 1.0);
        assert_eq!(corr[1][1], 1.0);
        assert_eq!(corr[0][1], corr[1][0]);
        assert!(corr[0][1].abs() <= 1.0 + 1e-12);
    }

    #[test]
    fn test_correlation_zero_variance_is_degenerate() {
        let cov = vec![vec![0.0, 0.0], vec![0.0, 1.0]];
        assert!(matches!(
            correlation_matrix(&cov),
            Err(PortfolioError::DegenerateVariance { .. })
        ));
    }

    #[test]
    fn test_report_defaults_to_equal_weights() {
        let input = PerformanceInput {
            returns: sample_returns(),
            weights: None,
            risk_free_rate: 0.0,
        };
        let result = calculate_portfolio_performance(&input).unwrap();
        assert_eq!(result.result.weights, vec![0.5, 0.5]);
        assert!(result.result.correlation_matrix.is_some());
        assert_eq!(result.result.observations, 3);
        assert_eq!(result.metadata.precision, "ieee754_f64");
    }

    #[test]
    fn test_report_normalises_relative_weights() {
        let input = PerformanceInput {
            returns: sample_returns(),
            weights: Some(vec![3.0, 1.0]),
            risk_free_rate: 0.0,
        };
        let result = calculate_portfolio_performance(&input).unwrap();
        assert!((result.result.weights[0] - 0.75).abs() < 1e-12);
        assert!((result.result.weights[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_report_rejects_nonfinite_risk_free_rate() {
        let input = PerformanceInput {
            returns: sample_returns(),
            weights: None,
            risk_free_rate: f64::NAN,
        };
        assert!(calculate_portfolio_performance(&input).is_err());
    }

    #[test]
    fn test_report_flags_degenerate_correlation_without_failing() {
        // One constant column: performance still computes, correlation is omitted
        let table = PriceTable {
            dates: (1..=3)
                .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
                .collect(),
            symbols: vec!["AAA".into(), "FLAT".into()],
            prices: vec![
                vec![Some(100.0), Some(50.0)],
                vec![Some(102.0), Some(50.0)],
                vec![Some(101.0), Some(50.0)],
            ],
        };
        let input = PerformanceInput {
            returns: log_returns(&table).unwrap(),
            weights: None,
            risk_free_rate: 0.0,
        };
        let result = calculate_portfolio_performance(&input).unwrap();
        assert!(result.result.correlation_matrix.is_none());
        assert!(!result.warnings.is_empty());
    }
}
