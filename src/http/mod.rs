//! HTTP server module
//!
//! - Axum router for the `/api/youtube` endpoints
//! - Handlers mapping `DownloadError` onto status codes
//! - CORS and request tracing middleware

pub mod handlers;
pub mod routes;

pub use routes::create_router;
