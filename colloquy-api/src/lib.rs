//! Colloquy API - HTTP Surface
//!
//! Axum routers over the conversation engine: buffered and server-sent-event
//! chat turns, transcript reads, and the inventory assistant with direct
//! inventory endpoints.

pub mod config;
pub mod error;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

pub use config::{ApiConfig, LogFormat};
pub use error::{ApiError, ApiResult, ErrorCode};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;
