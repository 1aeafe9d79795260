//! Core types and constants shared across hopline crates.
//!
//! This crate provides:
//! - Default configuration values
//! - Error kind labels for structured logging
//! - The tunnel relay that pumps bytes between a client and a tunnel

pub mod defaults;
pub mod errors;
pub mod io;

// Re-export commonly used items at crate root
pub use defaults::*;
pub use errors::*;

/// Project name.
pub const PROJECT_NAME: &str = "hopline";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
