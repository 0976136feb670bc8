//! Request and Response models for the cache maintenance API
//!
//! DTOs used for query parameters and JSON response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_key, SaveQuery};
pub use responses::{
    ContainsResponse, DeleteResponse, ErrorResponse, FlushResponse, HealthResponse, SetResponse,
    StatsResponse,
};
