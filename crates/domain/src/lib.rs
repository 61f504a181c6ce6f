//! # MealScribe Domain
//!
//! Business domain types and models for MealScribe.
//!
//! This crate contains:
//! - Food data types (`FoodItem`, `FoodChoice`, `FoodLogEntry`)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Provider constants
//!
//! ## Architecture
//! - No dependencies on other MealScribe crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
