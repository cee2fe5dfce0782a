// ABOUTME: Library module for sqlite-pg-transfer
// ABOUTME: Exports the stores, engines and commands for use in the binary and tests

pub mod commands;
pub mod config;
pub mod connector;
pub mod error;
pub mod migration;
pub mod postgres;
pub mod sqlite;
pub mod utils;
pub mod value;
