//! Command-line front end for sweepstat
//!
//! Loads a saved results file, normalizes it with `sweepstat_core`, and
//! prints the requested summaries as text tables or JSON.

pub mod cli;
pub mod load;
pub mod logging;
pub mod report;

#[cfg(test)]
mod tests;

pub use cli::{Args, OutputFormat, View, build_sections, render};
pub use load::{LoadError, LoadedResults, load_results};
pub use logging::init_logging;
