//! API Module
//!
//! HTTP handlers and routing for the cache maintenance API.
//!
//! # Endpoints
//! - `PUT|GET|DELETE /entries/:key` - Save, fetch or delete one entry
//! - `GET /entries/:key/exists` - Check for a live entry
//! - `DELETE /entries` - Flush the backend
//! - `POST /namespace/invalidate` - Drop the current namespace
//! - `GET /stats` - Backend statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
