//! HTTP Module
//!
//! Transport seam, the authenticated API client and the upload path.

mod client;
mod transport;
mod upload;

pub use client::{query_string, ApiClient};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use upload::{ProgressFn, Uploader};
