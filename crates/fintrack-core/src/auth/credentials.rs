use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a credential is presented in the `Authorization` header.
///
/// The token backend issues bearer tokens at login. The Basic backend has no
/// login endpoint; the credential is `base64(username:password)` built locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    #[default]
    Bearer,
    Basic,
}

impl AuthScheme {
    pub fn header_value(&self, credential: &Credential) -> String {
        match self {
            AuthScheme::Bearer => format!("Bearer {}", credential.value()),
            AuthScheme::Basic => format!("Basic {}", credential.value()),
        }
    }
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" | "token" => Ok(AuthScheme::Bearer),
            "basic" => Ok(AuthScheme::Basic),
            other => Err(format!("unknown auth scheme: {}", other)),
        }
    }
}

/// An opaque credential proving identity to the backend.
///
/// Equality compares the raw value only, so a credential restored from storage
/// equals the one that was issued.
#[derive(Clone)]
pub struct Credential {
    value: String,
    acquired_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// A credential minted in this process (login response, or Basic encoding).
    pub fn issued(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            acquired_at: Some(Utc::now()),
        }
    }

    /// A credential read back from durable storage; its acquisition time is unknown.
    pub fn restored(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            acquired_at: None,
        }
    }

    /// Encode `identifier:secret` for the Basic scheme.
    pub fn basic(identifier: &str, secret: &str) -> Self {
        Self::issued(STANDARD.encode(format!("{}:{}", identifier, secret)))
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn acquired_at(&self) -> Option<DateTime<Utc>> {
        self.acquired_at
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Recover the identifier from a Basic credential.
    pub fn basic_identifier(&self) -> Option<String> {
        let decoded = STANDARD.decode(self.value.as_bytes()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (identifier, _) = decoded.split_once(':')?;
        if identifier.is_empty() {
            None
        } else {
            Some(identifier.to_string())
        }
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"[redacted]")
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_credential_encoding() {
        let cred = Credential::basic("alice", "s3cret:with:colons");
        assert_eq!(cred.value(), STANDARD.encode("alice:s3cret:with:colons"));
        assert_eq!(cred.basic_identifier().as_deref(), Some("alice"));
        assert!(cred.acquired_at().is_some());
    }

    #[test]
    fn test_basic_identifier_rejects_garbage() {
        assert_eq!(Credential::restored("not base64 !!").basic_identifier(), None);
        assert_eq!(Credential::restored(STANDARD.encode(":pw")).basic_identifier(), None);
    }

    #[test]
    fn test_header_value() {
        let cred = Credential::restored("tok1");
        assert_eq!(AuthScheme::Bearer.header_value(&cred), "Bearer tok1");
        assert_eq!(AuthScheme::Basic.header_value(&cred), "Basic tok1");
    }

    #[test]
    fn test_equality_ignores_acquisition_time() {
        assert_eq!(Credential::issued("tok1"), Credential::restored("tok1"));
        assert_ne!(Credential::issued("tok1"), Credential::issued("tok2"));
    }

    #[test]
    fn test_debug_redacts_value() {
        let rendered = format!("{:?}", Credential::issued("super-secret-token"));
        assert!(!rendered.contains("super-secret-token"));
    }

    #[test]
    fn test_scheme_from_str() {
        assert_eq!("Bearer".parse::<AuthScheme>(), Ok(AuthScheme::Bearer));
        assert_eq!("basic".parse::<AuthScheme>(), Ok(AuthScheme::Basic));
        assert!("digest".parse::<AuthScheme>().is_err());
    }
}
