//! Port interfaces for meal logging
//!
//! Implemented in `mealscribe-infra` by the Fitbit food client and the
//! completion client.

use async_trait::async_trait;
use chrono::NaiveDate;
use mealscribe_domain::{FoodChoice, FoodItem, FoodLogEntry, Result};

/// Food database and diary of the nutrition provider
#[async_trait]
pub trait FoodProvider: Send + Sync {
    /// Search the provider's food database; best match first
    async fn search_foods(&self, query: &str) -> Result<Vec<FoodChoice>>;

    /// Add an entry to the user's food diary for `date`
    async fn log_food(&self, entry: &FoodLogEntry, date: NaiveDate) -> Result<()>;
}

/// Turns a free-text meal description into structured food items
#[async_trait]
pub trait MealInterpreter: Send + Sync {
    async fn interpret(&self, description: &str) -> Result<Vec<FoodItem>>;
}
