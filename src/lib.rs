//! Mobile Flows connectors: library crate shared by the binary and the
//! integration tests in `tests/`.

pub mod app;
pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod connectors;
pub mod context;
pub mod discovery;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod settings;
pub mod shape;
