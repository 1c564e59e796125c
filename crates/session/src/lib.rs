//! formgate-session: the form session controller.
//!
//! A [`FormSession`] owns the value snapshot for one form version, keeps the
//! resolved field state current after every edit, and drives submission
//! through its state machine:
//!
//! ```text
//! Idle -> Editing -> Validating -> Submitting -> Succeeded | Failed
//!            ^            |                           |
//!            +------------+---------------------------+
//! ```
//!
//! Observers follow along through a `tokio::sync::watch` channel of
//! [`SessionView`]s. [`SchemaLoader`] fetches the schema a session is built
//! from and lets a newer load cancel an older one.

mod controller;
mod error;
mod loader;
mod state;

pub use controller::FormSession;
pub use error::SessionError;
pub use loader::SchemaLoader;
pub use state::{HiddenValuePolicy, SessionOptions, SessionState, SessionView, SubmitOutcome};
