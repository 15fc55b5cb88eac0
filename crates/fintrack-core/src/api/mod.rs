//! REST API module for the FinTrack backend.
//!
//! - `Gateway`: the single chokepoint for HTTP calls. Attaches the session
//!   credential and normalizes failures into `ApiError`.
//! - `FinanceApi`: typed transaction, budget, dashboard and profile calls.
//! - `SubmitGuard`: rejects a second submission while the first is pending.

pub mod client;
pub mod error;
pub mod gateway;
pub mod guard;

pub use client::FinanceApi;
pub use error::{ApiError, ErrorKind};
pub use gateway::{ApiRequest, CredentialSource, Gateway, RequestAuth};
pub use guard::{SubmitGuard, SubmitTicket};
