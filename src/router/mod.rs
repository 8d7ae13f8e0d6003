//! Router control API.
//!
//! The router keeps a flat table of route name -> backend.  The daemon
//! reads the whole table once per cycle and then upserts or deletes
//! individual names.

use crate::types::RouteMap;
use async_trait::async_trait;
use thiserror::Error;

pub mod http;
pub use http::HttpRouter;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("router request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("router answered {status} for {operation}")]
    Status {
        operation: &'static str,
        status: u16,
    },
    #[error("invalid router URL: {0}")]
    Url(String),
}

#[async_trait]
pub trait RouterApi: Send + Sync {
    /// Current route table as reported by the router.
    async fn list_routes(&self) -> Result<RouteMap, RouterError>;

    /// Create `name`, or point it at `backend` if it already exists.
    async fn upsert_route(&self, name: &str, backend: &str) -> Result<(), RouterError>;

    async fn delete_route(&self, name: &str) -> Result<(), RouterError>;
}
