//! CLI commands for semrel
//!
//! - **plan**: analyze the repository and preview the release (read-only)
//! - **run**: execute the full release pipeline

pub mod plan;
pub mod run;

pub use plan::run_plan;
pub use run::run_release;
