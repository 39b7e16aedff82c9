//! Request and response bodies of the HTTP surface

pub mod error;
pub mod json;
pub mod speech;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
pub use speech::{EnginesResponse, TimestampsResponse, VoicesResponse};
