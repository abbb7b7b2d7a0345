pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliConfig;

pub use crate::config::AnalysisConfig;
pub use crate::core::{
    command::QuickFitCommand, converter::ScanConverter, poi_builder::PoiBuilder,
    result_parser::ResultParser, runner::ScanRequest, runner::ScanRunner,
};
pub use crate::utils::error::{QfError, Result};
