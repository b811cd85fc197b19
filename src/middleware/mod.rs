// ABOUTME: HTTP middleware for request tracing, authentication and CORS
// ABOUTME: Provides request spans, the API key guard and the CORS layer builder

pub mod auth;
pub mod cors;
pub mod tracing;

// Authentication middleware
pub use auth::{require_api_key, ApiKeyAuth};

// CORS configuration
pub use cors::setup_cors;

// Request tracing
pub use self::tracing::{create_request_span, request_id, REQUEST_ID_HEADER};
