//! Configuration loading
//!
//! Loads [`mealscribe_domain::Config`] from environment variables (with
//! `.env` support) or from a TOML/JSON file.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
