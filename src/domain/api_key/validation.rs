//! API Key validation utilities

use thiserror::Error;

/// Errors that can occur during API key validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiKeyValidationError {
    #[error("API key ID cannot be empty")]
    EmptyId,

    #[error("API key ID exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("API key ID must start and end with a letter or number")]
    InvalidBoundary,

    #[error("API key ID contains invalid character: '{0}'. Only alphanumeric characters and hyphens are allowed")]
    InvalidCharacter(char),

    #[error("API key name must be between 1 and {0} characters")]
    InvalidName(usize),

    #[error("Rate limit must be between 1 and {0} requests per window")]
    InvalidRateLimit(u32),
}

const MAX_API_KEY_ID_LENGTH: usize = 50;
const MAX_API_KEY_NAME_LENGTH: usize = 100;
pub const MAX_RATE_LIMIT: u32 = 100_000;

/// Validate an API key ID
///
/// Rules:
/// - Cannot be empty
/// - Maximum 50 characters
/// - Only alphanumeric characters and hyphens
/// - Must start and end with alphanumeric
pub fn validate_api_key_id(id: &str) -> Result<(), ApiKeyValidationError> {
    if id.is_empty() {
        return Err(ApiKeyValidationError::EmptyId);
    }

    if id.len() > MAX_API_KEY_ID_LENGTH {
        return Err(ApiKeyValidationError::TooLong(MAX_API_KEY_ID_LENGTH));
    }

    if let Some(c) = id.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
        return Err(ApiKeyValidationError::InvalidCharacter(c));
    }

    if id.starts_with('-') || id.ends_with('-') {
        return Err(ApiKeyValidationError::InvalidBoundary);
    }

    Ok(())
}

/// Validate a human-readable key name
pub fn validate_key_name(name: &str) -> Result<(), ApiKeyValidationError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_API_KEY_NAME_LENGTH {
        return Err(ApiKeyValidationError::InvalidName(MAX_API_KEY_NAME_LENGTH));
    }
    Ok(())
}

pub fn validate_rate_limit(rate_limit: u32) -> Result<(), ApiKeyValidationError> {
    if rate_limit == 0 || rate_limit > MAX_RATE_LIMIT {
        return Err(ApiKeyValidationError::InvalidRateLimit(MAX_RATE_LIMIT));
    }
    Ok(())
}
