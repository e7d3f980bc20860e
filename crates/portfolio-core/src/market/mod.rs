pub mod prices;
pub mod source;
