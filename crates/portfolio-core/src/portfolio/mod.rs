pub mod performance;
pub mod regression;
pub mod returns;
