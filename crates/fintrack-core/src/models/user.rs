use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::api::ApiError;

/// Minimum password length when creating an account.
const MIN_REGISTRATION_PASSWORD_LENGTH: usize = 6;

/// Minimum password length when changing a password.
const MIN_NEW_PASSWORD_LENGTH: usize = 8;

/// Currencies a profile may select.
pub const SUPPORTED_CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "JPY", "CAD", "AUD"];

fn default_currency() -> String {
    "USD".to_string()
}

/// The signed-in user's profile as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl UserProfile {
    /// Name for greetings, falling back through username to a generic label.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.username.as_deref())
            .unwrap_or("User")
    }
}

/// Sign-up form, including the confirmation field that never leaves the client.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationPayload<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.trim().is_empty() {
            return Err(ApiError::Validation("Username is required".to_string()));
        }
        if self.email.trim().is_empty() {
            return Err(ApiError::Validation("Email is required".to_string()));
        }
        if !self.email.contains('@') {
            return Err(ApiError::Validation("Email address is not valid".to_string()));
        }
        if self.password != self.confirm_password {
            return Err(ApiError::Validation("Passwords do not match".to_string()));
        }
        if self.password.chars().count() < MIN_REGISTRATION_PASSWORD_LENGTH {
            return Err(ApiError::Validation(format!(
                "Password must be at least {} characters",
                MIN_REGISTRATION_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    pub(crate) fn payload(&self) -> RegistrationPayload<'_> {
        RegistrationPayload {
            username: self.username.trim(),
            email: self.email.trim(),
            password: &self.password,
        }
    }
}

/// Change-password form.
#[derive(Debug, Clone, Default)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordChangePayload<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.current_password.is_empty() {
            return Err(ApiError::Validation("Current password is required".to_string()));
        }
        if self.new_password != self.confirm_password {
            return Err(ApiError::Validation("New passwords do not match".to_string()));
        }
        if self.new_password.chars().count() < MIN_NEW_PASSWORD_LENGTH {
            return Err(ApiError::Validation(format!(
                "Password must be at least {} characters long",
                MIN_NEW_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    pub(crate) fn payload(&self) -> PasswordChangePayload<'_> {
        PasswordChangePayload {
            current_password: &self.current_password,
            new_password: &self.new_password,
        }
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub currency: String,
}

impl ProfileUpdate {
    /// Prefill from the current profile.
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            name: profile.name.clone().unwrap_or_default(),
            email: profile.email.clone().unwrap_or_default(),
            currency: profile.currency.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(ApiError::Validation("Email address is not valid".to_string()));
        }
        if !SUPPORTED_CURRENCIES.contains(&self.currency.as_str()) {
            return Err(ApiError::Validation(format!(
                "Unsupported currency: {}",
                self.currency
            )));
        }
        Ok(())
    }
}
