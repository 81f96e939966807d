//!
//! Utility module for the alias indexer.
//!
//! Re-exports formatting helpers used in logs and event output.
/// Utility functions for formatting and display
pub mod index;

pub use index::format_xec_amount;
