// src/config/mod.rs

//! Plan file loading and validation.
//!
//! The plan file is the hand-off from the setup wizard: the ordered steps and
//! the final environment, already assembled.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a plan file from disk (`loader.rs`).
//! - Validate it into a `PlanFile` (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_plan};
pub use model::{ConfigSection, PlanFile, RawPlanFile, StepConfig};
