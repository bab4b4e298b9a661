//! Walk Compiler - Application Library
//!
//! Command-line front end for `walk-summary-lib`: maps CLI settings onto the compiler, runs a
//! batch over a directory of GPX files and writes the combined manifest.

mod app;

pub use app::settings::Settings;
pub use app::{AppError, RunReport, run, setup_logging};
