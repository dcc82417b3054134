//! Volume registration.
//!
//! Registration is a two-step process:
//! 1. `register()` validates the form and asks the server for a confirmation code
//! 2. `confirm()` sends the kept form plus the code to create the volume
//!
//! Between the two steps the form is held as a [`PendingRegistration`], which
//! can be serialized so the steps may run in different processes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::SendCodeRequest;
use crate::error::{CloudError, Result};

/// Minimum password length accepted before any request is made.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Registration form kept between `register()` and `confirm()`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Requested capacity in MB
    pub storage_mb: u32,
}

impl fmt::Debug for PendingRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRegistration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("storage_mb", &self.storage_mb)
            .finish()
    }
}

impl PendingRegistration {
    /// Validate the registration form.
    ///
    /// Name and email are trimmed. All fields are required and the password
    /// must have at least [`MIN_PASSWORD_LEN`] characters.
    pub fn new(name: &str, email: &str, password: &str, storage_mb: u32) -> Result<Self> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(CloudError::validation(
                "register",
                "Please fill in all fields",
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CloudError::validation(
                "password",
                format!(
                    "Password must be at least {} characters",
                    MIN_PASSWORD_LEN
                ),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            storage_mb,
        })
    }

    /// Capacity as sent on the wire, e.g. "500MB".
    pub fn storage_label(&self) -> String {
        format!("{}MB", self.storage_mb)
    }

    pub fn to_request(&self) -> SendCodeRequest {
        SendCodeRequest {
            vm_name: self.name.clone(),
            vm_email: self.email.clone(),
            vm_password: self.password.clone(),
            vm_storage: self.storage_label(),
        }
    }

    /// Serialize state for storage between steps.
    ///
    /// Contains the password in clear; store it accordingly.
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize state from string.
    pub fn deserialize(s: &str) -> Result<Self> {
        let state: Self = serde_json::from_str(s.trim())
            .map_err(|e| CloudError::InvalidState(format!("Expected registration JSON: {}", e)))?;
        // Re-validate so a hand-edited state file cannot skip the local checks.
        Self::new(&state.name, &state.email, &state.password, state.storage_mb)
    }
}
