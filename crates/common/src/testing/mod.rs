//! Testing utilities
//!
//! - [`mocks`]: in-memory [`SessionStore`](crate::auth::SessionStore),
//!   [`ProviderClientTrait`](crate::auth::ProviderClientTrait) and
//!   [`AuthProvider`](crate::auth::AuthProvider) doubles
//! - [`fixtures`]: redirect URL builders for the implicit and code flows

pub mod fixtures;
pub mod mocks;

pub use fixtures::{code_redirect, implicit_redirect, ImplicitRedirect};
pub use mocks::{IntrospectionScript, MockAuthProvider, MockProviderClient, MockSessionStore};
