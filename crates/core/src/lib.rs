//! # MealScribe Core
//!
//! Business logic for turning a meal description into food diary entries.
//!
//! This crate contains:
//! - Port interfaces for the food database and the meal interpreter
//! - The [`MealLogger`] use case
//!
//! ## Architecture Principles
//! - Only depends on `mealscribe-domain`
//! - No HTTP, storage or platform code
//! - All external dependencies via traits

pub mod meal;

pub use meal::ports::{FoodProvider, MealInterpreter};
pub use meal::service::{LogReport, MealLogger, ProposedEntry};
