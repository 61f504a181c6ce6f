//! Meal logging service - core business logic

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use mealscribe_domain::{
    FoodChoice, FoodItem, FoodLogEntry, MealType, MealscribeError, Result,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::ports::{FoodProvider, MealInterpreter};

/// One interpreted food item with the provider's candidate matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposedEntry {
    pub item: FoodItem,
    /// Search results in provider order; the first is the best match
    pub candidates: Vec<FoodChoice>,
}

impl ProposedEntry {
    #[must_use]
    pub fn best_match(&self) -> Option<&FoodChoice> {
        self.candidates.first()
    }

    /// Log entry for the candidate at `index`
    #[must_use]
    pub fn select(&self, index: usize, meal_type: MealType) -> Option<FoodLogEntry> {
        self.candidates
            .get(index)
            .map(|choice| FoodLogEntry::new(choice.clone(), &self.item).with_meal_type(meal_type))
    }

    /// Log entry for the best match
    #[must_use]
    pub fn to_log_entry(&self, meal_type: MealType) -> Option<FoodLogEntry> {
        self.select(0, meal_type)
    }
}

/// Result of logging a batch of entries
///
/// Logging stops at the first failure.
#[derive(Debug)]
pub struct LogReport {
    pub logged: usize,
    pub failure: Option<MealscribeError>,
}

impl LogReport {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// # Errors
    /// The failure that stopped the batch.
    pub fn into_result(self) -> Result<usize> {
        match self.failure {
            None => Ok(self.logged),
            Some(err) => Err(err),
        }
    }
}

/// Meal logging service
pub struct MealLogger {
    interpreter: Arc<dyn MealInterpreter>,
    provider: Arc<dyn FoodProvider>,
}

impl MealLogger {
    pub fn new(interpreter: Arc<dyn MealInterpreter>, provider: Arc<dyn FoodProvider>) -> Self {
        Self { interpreter, provider }
    }

    /// Interpret `description` and look up candidates for every item.
    ///
    /// # Errors
    /// The first interpreter or search failure.
    pub async fn propose(&self, description: &str) -> Result<Vec<ProposedEntry>> {
        let items = self.interpreter.interpret(description).await?;
        debug!(items = items.len(), "Meal interpreted");

        let mut proposals = Vec::with_capacity(items.len());
        for item in items {
            let query = item.name.trim();
            let candidates = if query.is_empty() {
                Vec::new()
            } else {
                self.provider.search_foods(query).await?
            };
            if candidates.is_empty() {
                debug!(food = %item.name, "No provider match");
            }
            proposals.push(ProposedEntry { item, candidates });
        }

        Ok(proposals)
    }

    /// Log `entries` for `date`, in order, stopping at the first failure.
    pub async fn log_entries(&self, entries: &[FoodLogEntry], date: NaiveDate) -> LogReport {
        let mut logged = 0;
        for entry in entries {
            if let Err(err) = self.provider.log_food(entry, date).await {
                warn!(
                    error = %err,
                    food_id = %entry.choice.id,
                    logged,
                    remaining = entries.len() - logged,
                    "Food logging stopped"
                );
                return LogReport { logged, failure: Some(err) };
            }
            logged += 1;
        }

        info!(logged, %date, "Meal logged");
        LogReport { logged, failure: None }
    }

    /// [`log_entries`](Self::log_entries) for today in local time
    pub async fn log_entries_today(&self, entries: &[FoodLogEntry]) -> LogReport {
        self.log_entries(entries, Local::now().date_naive()).await
    }
}
