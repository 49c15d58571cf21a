//! Request and Response models
//!
//! This module defines the DTOs (Data Transfer Objects) exchanged with the
//! backend.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::RefreshRequest;
pub use responses::{ApiResponse, ErrorBody, RefreshTokens, UploadedFile};
