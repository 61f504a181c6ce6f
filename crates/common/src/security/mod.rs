//! Platform secret storage
//!
//! [`KeychainProvider`] is a thin wrapper over the OS keychain (macOS
//! Keychain, Windows Credential Manager, Linux Secret Service). The auth
//! module layers its session store on top of it.

pub mod keychain;

pub use keychain::{KeychainError, KeychainProvider};
