//! Output module for crawl results and store summaries
//!
//! This module handles:
//! - Writing the harvested result tree as a JSON dump
//! - Printing row counts and the latest run from the record store

mod dump;
pub mod stats;

pub use dump::{render_dump, write_dump};
pub use stats::{format_statistics, load_statistics, print_statistics, StoreStatistics};
