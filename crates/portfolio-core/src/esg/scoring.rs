use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use crate::error::PortfolioError;
use crate::types::{with_metadata, ComputationOutput};
use crate::PortfolioResult;

/// Input for mock ESG scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsgInput {
    pub tickers: Vec<String>,
    /// PRNG seed. Same seed, same scores.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsgScore {
    pub ticker: String,
    /// Synthetic score in 50..=94.
    pub score: u32,
    pub rating: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsgOutput {
    /// Scores in ticker input order.
    pub scores: Vec<EsgScore>,
    pub average_score: f64,
}

/// Synthetic ESG scores for a ticker list.
///
/// Scores are uniform draws in 50..=94, one per ticker in input order.
/// This is a placeholder provider: values carry no information about the
/// underlying companies, and the output always says so in a warning.
pub fn mock_esg_scores(input: &EsgInput) -> PortfolioResult<ComputationOutput<EsgOutput>> {
    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(input.seed);
    let output = mock_esg_scores_with_rng(input, &mut rng)?;

    let warnings = vec![
        "ESG scores are synthetic placeholders, not provider data".to_string(),
    ];
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Mock ESG Scoring",
        &serde_json::json!({
            "n_tickers": input.tickers.len(),
            "score_range": [50, 94],
            "seed": input.seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Scoring against a caller-owned PRNG.
pub fn mock_esg_scores_with_rng(
    input: &EsgInput,
    rng: &mut impl Rng,
) -> PortfolioResult<EsgOutput> {
    if input.tickers.is_empty() {
        return Err(PortfolioError::EmptyInput {
            context: "ticker list".into(),
        });
    }
    let mut seen = HashSet::new();
    for ticker in &input.tickers {
        if !seen.insert(ticker.as_str()) {
            return Err(PortfolioError::InvalidInput {
                field: "tickers".into(),
                reason: format!("Duplicate ticker: {}", ticker),
            });
        }
    }

    let mut scores = Vec::with_capacity(input.tickers.len());
    for ticker in &input.tickers {
        let score: u32 = rng.gen_range(50..95);
        scores.push(EsgScore {
            ticker: ticker.clone(),
            score,
            rating: score_to_rating(score as f64).to_string(),
        });
    }
    let average_score =
        scores.iter().map(|s| s.score as f64).sum::<f64>() / scores.len() as f64;

    Ok(EsgOutput {
        scores,
        average_score,
    })
}

/// Letter rating for a 0-100 ESG score.
pub fn score_to_rating(score: f64) -> &'static str {
    if score >= 85.0 {
        "AAA"
    } else if score >= 70.0 {
        "AA"
    } else if score >= 55.0 {
        "A"
    } else if score >= 40.0 {
        "BBB"
    } else if score >= 25.0 {
        "BB"
    } else if score >= 10.0 {
        "B"
    } else {
        "CCC"
    }
}
