//! Portfolio risk/return analytics with stochastic forecasting.
//!
//! The pipeline starts from a dated price table, derives daily log
//! returns, and aggregates them into annualised performance numbers
//! (return, volatility, Sharpe), benchmark regression (beta, Jensen's
//! alpha), and a random-search frontier. A Geometric Brownian Motion
//! engine projects portfolio value forward under a fixed seed.
//!
//! Feature flags:
//! - `frontier`: random frontier sampling (pulls in `rand` and `statrs`)
//! - `monte_carlo`: GBM value forecasting (implies `frontier`)
//! - `esg`: synthetic ESG scoring
//! - `full`: everything above

pub mod error;
pub mod market;
pub mod portfolio;
pub mod types;

#[cfg(feature = "esg")]
pub mod esg;
#[cfg(feature = "frontier")]
pub mod frontier;
#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use error::PortfolioError;
pub use types::*;

/// Standard result type for all portfolio operations
pub type PortfolioResult<T> = Result<T, PortfolioError>;
