//! The `error` module defines the error types used within `broadcast`.
//!
//! Hub operations themselves never fail: unknown topics are created lazily,
//! unknown listeners are ignored and resolving twice is a rebind. Errors only
//! surface at the edges, when a waiter loses its topic, when the dispatch
//! thread cannot be started or when configuration fails to load.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    /// The topic (or the whole hub) was dropped before it resolved.
    #[error("topic was dropped before it resolved")]
    Dropped,

    #[error("failed to start dispatch thread: {0}")]
    Dispatcher(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, HubError>;
