use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PortfolioError;
use crate::market::prices::PriceTable;
use crate::PortfolioResult;

/// Matrix of daily log returns, one column per symbol.
///
/// Derived from a [`PriceTable`]: one row fewer than the price history,
/// and only rows where every column had a defined return survive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnMatrix {
    pub dates: Vec<NaiveDate>,
    pub symbols: Vec<String>,
    /// Row-major: `values[row][col]`.
    pub values: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    pub fn num_rows(&self) -> usize {
        self.values.len()
    }

    pub fn num_assets(&self) -> usize {
        self.symbols.len()
    }
}

/// A single dated series of daily values (returns or growth levels).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl ReturnSeries {
    /// Growth of one unit: the running product of `1 + r` over the series.
    pub fn cumulative(&self) -> ReturnSeries {
        let mut level = 1.0;
        let values = self
            .values
            .iter()
            .map(|r| {
                level *= 1.0 + r;
                level
            })
            .collect();
        ReturnSeries {
            dates: self.dates.clone(),
            values,
        }
    }
}

/// Compute daily log returns `ln(p_t / p_{t-1})` per column.
///
/// The leading row is undefined and discarded, as is any row where a
/// column has no defined return (missing price on either side,
/// non-positive price, non-finite ratio). If nothing survives the
/// row-dropping, the failure names the columns responsible so a caller
/// can drop or re-fetch them instead of guessing.
pub fn log_returns(table: &PriceTable) -> PortfolioResult<ReturnMatrix> {
    table.validate()?;
    if table.num_rows() < 2 {
        return Err(PortfolioError::InsufficientData(
            "At least 2 price rows required to compute returns".into(),
        ));
    }

    let n = table.num_assets();
    let mut dates = Vec::with_capacity(table.num_rows() - 1);
    let mut values: Vec<Vec<f64>> = Vec::with_capacity(table.num_rows() - 1);

    for t in 1..table.num_rows() {
        let mut row = Vec::with_capacity(n);
        let mut complete = true;
        for col in 0..n {
            match log_return(table.prices[t - 1][col], table.prices[t][col]) {
                Some(r) => row.push(r),
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            dates.push(table.dates[t]);
            values.push(row);
        }
    }

    if values.is_empty() {
        return Err(PortfolioError::DegenerateReturns {
            symbols: offending_columns(table),
        });
    }

    Ok(ReturnMatrix {
        dates,
        symbols: table.symbols.clone(),
        values,
    })
}

/// Mean daily return per column.
pub fn mean_returns(returns: &ReturnMatrix) -> Vec<f64> {
    let rows = returns.num_rows();
    if rows == 0 {
        return vec![0.0; returns.num_assets()];
    }
    (0..returns.num_assets())
        .map(|col| returns.values.iter().map(|row| row[col]).sum::<f64>() / rows as f64)
        .collect()
}

/// Normalize non-negative relative weights to sum to 1. An all-zero
/// vector falls back to equal weights.
pub fn normalize_weights(raw: &[f64]) -> PortfolioResult<Vec<f64>> {
    if raw.is_empty() {
        return Err(PortfolioError::EmptyInput {
            context: "weight vector".into(),
        });
    }
    for (i, w) in raw.iter().enumerate() {
        if !w.is_finite() || *w < 0.0 {
            return Err(PortfolioError::InvalidInput {
                field: "weights".into(),
                reason: format!("Weight {} at index {} must be finite and >= 0", w, i),
            });
        }
    }
    let total: f64 = raw.iter().sum();
    if total == 0.0 {
        return Ok(equal_weights(raw.len()));
    }
    Ok(raw.iter().map(|w| w / total).collect())
}

/// Equal weights for n assets.
pub fn equal_weights(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

/// Weighted daily portfolio return series: each row of the matrix dotted
/// with the weight vector.
pub fn portfolio_series(returns: &ReturnMatrix, weights: &[f64]) -> PortfolioResult<ReturnSeries> {
    if weights.len() != returns.num_assets() {
        return Err(PortfolioError::DimensionMismatch {
            context: "portfolio series weights".into(),
            expected: returns.num_assets(),
            actual: weights.len(),
        });
    }
    let values = returns
        .values
        .iter()
        .map(|row| row.iter().zip(weights.iter()).map(|(r, w)| r * w).sum())
        .collect();
    Ok(ReturnSeries {
        dates: returns.dates.clone(),
        values,
    })
}

/// Log return for one consecutive price pair. `None` when either side is
/// missing, non-positive, or the ratio is not finite.
fn log_return(prev: Option<f64>, curr: Option<f64>) -> Option<f64> {
    match (prev, curr) {
        (Some(p0), Some(p1)) if p0.is_finite() && p1.is_finite() && p0 > 0.0 && p1 > 0.0 => {
            let r = (p1 / p0).ln();
            r.is_finite().then_some(r)
        }
        _ => None,
    }
}

/// Columns with no valid consecutive price pair anywhere. When rows
/// vanished through misalignment alone (every column has pairs, just
/// never on the same row), all symbols are reported.
fn offending_columns(table: &PriceTable) -> Vec<String> {
    let offenders: Vec<String> = table
        .symbols
        .iter()
        .enumerate()
        .filter(|(col, _)| {
            !(1..table.num_rows())
                .any(|t| log_return(table.prices[t - 1][*col], table.prices[t][*col]).is_some())
        })
        .map(|(_, s)| s.clone())
        .collect();
    if offenders.is_empty() {
        table.symbols.clone()
    } else {
        offenders
    }
}
