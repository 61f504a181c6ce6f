//! Meal logging: interpret free text, match foods, write the diary.

pub mod ports;
pub mod service;
