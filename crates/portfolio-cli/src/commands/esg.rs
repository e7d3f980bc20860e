use clap::Args;
use serde_json::Value;

use portfolio_core::esg::scoring::{self, EsgInput};

use crate::input;

/// Arguments for mock ESG scoring
#[derive(Args)]
pub struct EsgArgs {
    /// Comma-separated ticker symbols (e.g. "AAPL,MSFT,GOOG")
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// PRNG seed (with --tickers; file and piped inputs carry their own)
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

pub fn run_esg(args: EsgArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let esg_input: EsgInput = if let Some(tickers) = args.tickers {
        EsgInput {
            tickers,
            seed: args.seed,
        }
    } else if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--tickers or --input <file.json> or piped JSON required".into());
    };
    let result = scoring::mock_esg_scores(&esg_input)?;
    Ok(serde_json::to_value(result)?)
}
