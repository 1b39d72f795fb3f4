//! Profile domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the profile domain
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Attempted to write an attribute outside the fixed attribute set
    #[error("Unknown attribute {0}.")]
    UnknownAttribute(String),

    /// A value could not be interpreted for the attribute
    #[error("Invalid value for attribute {attribute}: {message}")]
    InvalidValue { attribute: String, message: String },

    /// A profile must be saved under a non-empty name
    #[error("Profile name must not be empty")]
    MissingName,

    /// Another profile is already stored under the name
    #[error("A profile named {0} already exists")]
    NameTaken(String),

    /// Another profile already claims some of the selector's form ids
    #[error("Form id(s) {form_ids} already used by profile {other}")]
    SelectorConflict { other: String, form_ids: String },

    /// Profile with the given name was not found
    #[error("Profile not found: {0}")]
    NotFound(String),

    /// Loading or persisting the profile collection failed
    #[error("Profile storage error: {0}")]
    Storage(#[from] PortError),
}

impl ProfileError {
    /// Creates an InvalidValue error
    pub fn invalid(attribute: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ProfileError::InvalidValue {
            attribute: attribute.into(),
            message: message.to_string(),
        }
    }

    /// Returns true for errors caused by the caller's input rather than storage
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, ProfileError::Storage(_))
    }
}
