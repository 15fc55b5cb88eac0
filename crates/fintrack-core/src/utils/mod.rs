//! Utility functions for display formatting.

pub mod format;

pub use format::{currency_symbol, format_amount, format_date, truncate_string};
