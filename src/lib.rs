pub mod adapters;
#[cfg(feature = "cli")]
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::OpsConfig;
pub use domain::model::Record;
pub use utils::error::{OpsError, Result};
