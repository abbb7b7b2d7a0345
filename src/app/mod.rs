#[cfg(feature = "cli")]
pub mod commands;
pub mod plots;
