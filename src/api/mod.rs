//! API Module
//!
//! HTTP facade over a [`CacheManager`](crate::manager::CacheManager).
//!
//! # Endpoints
//! - `GET /caches` - List cache names
//! - `DELETE /caches` - Clear every cache
//! - `DELETE /caches/:name` - Unregister a cache (durable entries are kept)
//! - `GET /caches/:name/keys/:key` - Read a value
//! - `PUT /caches/:name/keys/:key` - Write a value (`{"value": ..., "ttl": secs}`)
//! - `DELETE /caches/:name/keys/:key` - Delete a value
//! - `POST /caches/:name/cleanup` - Sweep one cache now
//! - `GET /stats` - Per-cache tier statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
