//! API Key domain
//!
//! Caller identity and entitlements: the key entity, its validation rules and
//! the persistence-agnostic repository contract.

mod entity;
mod repository;
mod validation;

pub use entity::{ApiKey, ApiKeyId, DEFAULT_RATE_LIMIT};
pub use repository::ApiKeyRepository;
pub use validation::{
    validate_api_key_id, validate_key_name, validate_rate_limit, ApiKeyValidationError,
    MAX_RATE_LIMIT,
};

#[cfg(test)]
pub use repository::mock;
