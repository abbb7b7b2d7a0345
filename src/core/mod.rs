pub mod command;
pub mod converter;
pub mod poi_builder;
pub mod result_parser;
pub mod runner;

pub use crate::domain::model::{ScanOutcome, ScanPoint, Seeds};
pub use crate::domain::ports::{FitExecutor, JobSubmitter, ResultReader};
pub use crate::utils::error::Result;
