//! API Module
//!
//! HTTP handlers and routing exposing the cache over REST.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value with an optional lifetime
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /clear` - Remove every entry
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health and readiness

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
