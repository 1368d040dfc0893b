//! Library exports for corsotron, shared between the binary and tests.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod rules;
pub mod updater;
pub mod utils;
