//! Cancellable schema loading.

use std::sync::Mutex;

use formgate_schema::{FormVersion, VersionId};
use formgate_transport::FormTransport;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SessionError;

/// Fetches form versions, one at a time. Starting a load cancels the one
/// before it, so only the latest request can produce a schema.
#[derive(Default)]
pub struct SchemaLoader {
    current: Mutex<Option<CancellationToken>>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        SchemaLoader::default()
    }

    pub async fn load(
        &self,
        transport: &dyn FormTransport,
        version_id: &VersionId,
    ) -> Result<FormVersion, SessionError> {
        let cancel = CancellationToken::new();
        {
            let mut current = self
                .current
                .lock()
                .map_err(|_| SessionError::StatePoisoned("starting schema load"))?;
            if let Some(previous) = current.replace(cancel.clone()) {
                previous.cancel();
            }
        }
        debug!(version = %version_id, "loading form version");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
            fetched = transport.fetch_schema(version_id) => fetched.map_err(SessionError::from),
        };

        // a response that raced the cancellation is still dropped
        if cancel.is_cancelled() {
            debug!(version = %version_id, "schema load cancelled");
            return Err(SessionError::Cancelled);
        }
        result
    }

    /// Cancel the load in progress, if any.
    pub fn cancel(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(token) = current.take() {
                token.cancel();
            }
        }
    }
}
