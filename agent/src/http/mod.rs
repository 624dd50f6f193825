pub mod client;
pub mod mowers;
