//! OAuth 2.0 session management for the nutrition provider
//!
//! The app authenticates with the implicit flow: the user is sent to the
//! provider's authorize page and comes back with the access token in the
//! redirect fragment. A PKCE-protected authorization-code path is available
//! for shells that can receive query redirects.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  AuthSessionManager  │  implements AuthProvider
//! └──────────┬───────────┘
//!            │
//!            ├──► ProviderClient      (introspect / revoke / token exchange)
//!            ├──► redirect            (fragment + query parsing)
//!            ├──► pkce                (nonces, S256 challenge)
//!            └──► SessionVault
//!                      │
//!                      └──► SessionStore  (MemorySessionStore | KeychainSessionStore)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mealscribe_common::auth::{AuthSessionManager, MemorySessionStore};
//! use mealscribe_domain::{ProviderConfig, RedirectTarget};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProviderConfig::new(
//!     "23ABCD",
//!     RedirectTarget::Native { scheme: "mealscribe".into(), path: "auth".into() },
//! );
//! let manager = AuthSessionManager::for_provider(config, Arc::new(MemorySessionStore::new()))?;
//!
//! if !manager.initialize(None).await {
//!     let url = manager.build_auth_url().await?;
//!     println!("Open {url}");
//!     // ... the shell receives mealscribe://auth#access_token=... ...
//!     # let redirect = url::Url::parse("mealscribe://auth#")?;
//!     manager.extract_token(&redirect).await?;
//! }
//!
//! let status = manager.authentication_status().await;
//! println!("{status}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod keychain;
pub mod pkce;
pub mod redirect;
pub mod service;
pub mod store;
pub mod traits;
pub mod types;
pub mod vault;

pub use client::{ProviderClient, ProviderClientError};
pub use keychain::KeychainSessionStore;
pub use pkce::{generate_state, validate_state, PkceChallenge};
pub use redirect::{RedirectParams, TokenExtractionError};
pub use service::AuthSessionManager;
pub use store::{MemorySessionStore, StoreError};
pub use traits::{AuthProvider, ProviderClientTrait, SessionStore};
pub use types::{AuthenticationStatus, Session, SessionKey, TokenIntrospection, TokenResponse};
pub use vault::SessionVault;
