pub mod analyze;
pub mod esg;
pub mod forecast;
pub mod frontier;
