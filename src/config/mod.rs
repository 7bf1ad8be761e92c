#[cfg(feature = "cli")]
pub mod cli;
pub mod env;
pub mod ops_config;

pub use ops_config::{OpsConfig, TableConfig};
