//! FinTrack core library.
//!
//! Session management, the authenticated request gateway, and typed access to
//! the finance backend. Front ends construct one [`SessionManager`] at their
//! root, call [`SessionManager::bootstrap`] once, and build a [`FinanceApi`]
//! from its gateway.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiError, ErrorKind, FinanceApi, Gateway, SubmitGuard};
pub use auth::{AuthScheme, AuthStatus, Credential, CredentialStore, SessionManager, SessionState};
pub use config::Config;
