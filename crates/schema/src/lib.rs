//! formgate-schema: typed form version schema and load-time checks.
//!
//! A form version is fetched once and read-only for the rest of a session.
//! [`FormVersion::from_json`] unwraps the optional `data` envelope the
//! schema endpoint returns, deserializes the typed structs, and then runs
//! the structural checks in [`check_schema`] so that duplicate field ids
//! and dangling rule references surface as a [`SchemaError`] before any
//! evaluation happens.

pub mod deserialize;
pub mod error;
pub mod types;

pub use deserialize::check_schema;
pub use error::SchemaError;
pub use types::*;
