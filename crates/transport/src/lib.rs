//! formgate-transport: the collaborator the session controller talks to
//! for fetching schemas, submitting payloads and uploading files.
//!
//! [`HttpTransport`] speaks the form-versions REST API; [`StaticTransport`]
//! serves everything from memory and records what it was sent.

mod config;
mod error;
pub mod http;
mod record;
pub mod static_transport;
mod traits;

pub use config::{ConfigError, TransportConfig};
pub use error::TransportError;
pub use http::HttpTransport;
pub use record::{FileUpload, SubmissionResult, SubmitterId, UploadedFile};
pub use static_transport::StaticTransport;
pub use traits::FormTransport;
