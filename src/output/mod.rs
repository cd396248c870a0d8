//! Output module for run reports
//!
//! This module handles:
//! - Rendering the markdown report written into the output directory
//! - Printing run statistics to the console

mod report;
pub mod stats;

pub use report::render_report;
pub use stats::print_statistics;
