//! API Key infrastructure implementations
//!
//! Secret hashing, in-memory storage, fixed-window rate limiting and the
//! administrative service.

mod hasher;
mod rate_limiter;
mod repository;
mod service;

pub use hasher::{ApiKeyHasher, GeneratedSecret};
pub use rate_limiter::{RateLimitResult, RateLimiter};
pub use repository::InMemoryApiKeyRepository;
pub use service::{ApiKeyService, CreateApiKeyRequest, CreateApiKeyResult};
