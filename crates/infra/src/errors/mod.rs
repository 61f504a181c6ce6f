//! Error conversions between infrastructure crates and the domain error.

pub mod conversions;

pub use conversions::InfraError;
