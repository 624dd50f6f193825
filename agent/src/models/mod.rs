pub mod action;
pub mod api;
pub mod error_codes;
pub mod execution;
pub mod mower;
