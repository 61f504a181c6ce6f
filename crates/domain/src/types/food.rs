//! Food types shared by the completion service, the food provider and the
//! meal pipeline.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// One component of a described meal, as extracted by the completion
/// service.
///
/// The completion prompt historically asked for German field names, so the
/// German keys are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    #[serde(alias = "Name des Bestandteils", alias = "Name", alias = "food")]
    pub name: String,
    #[serde(alias = "Einheit")]
    pub unit: String,
    #[serde(alias = "Menge", alias = "quantity", deserialize_with = "deserialize_amount")]
    pub amount: f64,
}

impl FoodItem {
    #[must_use]
    pub fn new(name: impl Into<String>, unit: impl Into<String>, amount: f64) -> Self {
        Self { name: name.into(), unit: unit.into(), amount }
    }
}

/// Accepts `200`, `200.5` and `"200"` (completion output is not typed).
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
    }

    match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(value) => Ok(value),
        RawAmount::Text(text) => text
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("amount is not a number: {text}"))),
    }
}

/// A candidate match from the provider's food database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodChoice {
    pub id: String,
    pub name: String,
    pub brand: String,
    /// Provider id of the food's default unit
    pub unit_id: String,
}

/// Meal-time classification attached to a diary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    MorningSnack,
    Lunch,
    AfternoonSnack,
    Dinner,
    #[default]
    Anytime,
}

impl MealType {
    /// Fitbit `mealTypeId`
    #[must_use]
    pub const fn provider_id(self) -> u8 {
        match self {
            Self::Breakfast => 1,
            Self::MorningSnack => 2,
            Self::Lunch => 3,
            Self::AfternoonSnack => 4,
            Self::Dinner => 5,
            Self::Anytime => 7,
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Breakfast => "breakfast",
            Self::MorningSnack => "morning_snack",
            Self::Lunch => "lunch",
            Self::AfternoonSnack => "afternoon_snack",
            Self::Dinner => "dinner",
            Self::Anytime => "anytime",
        };
        f.write_str(name)
    }
}

/// A chosen food merged with the amount the user ate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodLogEntry {
    pub choice: FoodChoice,
    pub amount: f64,
    #[serde(default)]
    pub meal_type: MealType,
}

impl FoodLogEntry {
    /// Merge a provider choice with the amount of the described item.
    #[must_use]
    pub fn new(choice: FoodChoice, item: &FoodItem) -> Self {
        Self { choice, amount: item.amount, meal_type: MealType::default() }
    }

    #[must_use]
    pub fn with_meal_type(mut self, meal_type: MealType) -> Self {
        self.meal_type = meal_type;
        self
    }
}
