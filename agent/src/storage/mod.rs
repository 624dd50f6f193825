pub mod mower_config;
pub mod settings;
