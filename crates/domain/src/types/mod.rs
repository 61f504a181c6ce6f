//! Domain types and models

pub mod food;

pub use food::{FoodChoice, FoodItem, FoodLogEntry, MealType};
