//! EduChain client - resilience layer for the EduChain backend API
//!
//! Provides a bounded TTL response cache with get-or-populate helpers, and an
//! authenticated transport that refreshes expired access tokens with a
//! single shared network call.

pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod tasks;

pub use app::AppState;
pub use cache::{cache_key, ResponseCache};
pub use config::Config;
pub use error::{ClientError, Result};
pub use http::ApiClient;
pub use tasks::spawn_cleanup_task;
