//! Shared building blocks for MealScribe crates.
//!
//! - [`auth`]: OAuth2 implicit-flow session management for the nutrition
//!   provider (the only component that owns credentials)
//! - [`security`]: platform keychain access used as durable session storage
//! - [`testing`]: in-memory mocks for the store and provider traits

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod security;
pub mod testing;

pub use auth::{
    AuthProvider, AuthSessionManager, AuthenticationStatus, KeychainSessionStore,
    MemorySessionStore, ProviderClient, Session, SessionStore, StoreError, TokenExtractionError,
};
pub use security::{KeychainError, KeychainProvider};
