//! Mower Agent Library
//!
//! Core modules for the robotic mower cloud polling agent.

pub mod app;
pub mod authn;
pub mod commands;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod sink;
pub mod storage;
pub mod utils;
pub mod workers;
