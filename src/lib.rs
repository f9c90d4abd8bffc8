pub mod checks;
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod environment;
pub mod exit;
pub mod registry;
pub mod store;
pub mod ui;
