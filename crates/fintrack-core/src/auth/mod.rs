//! Authentication module for managing the user session and its credential.
//!
//! This module provides:
//! - `SessionManager`: login/register/logout, startup revalidation, and the
//!   observable `SessionState`
//! - `Credential` and `AuthScheme`: the opaque credential and how it is presented
//! - `CredentialStore`: durable storage behind a `{get, set, remove}` interface,
//!   with memory, file and OS-keyring backends

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::{AuthScheme, Credential};
pub use session::{AuthStatus, SessionManager, SessionState};
pub use store::{
    open_store, CredentialBackend, CredentialStore, FileStore, KeyringStore, MemoryStore,
    PROFILE_KEY, TOKEN_KEY,
};
