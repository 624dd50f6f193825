pub mod mowers;
