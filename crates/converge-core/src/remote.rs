//! The boundary between the engine and the remote inventory API.
//!
//! The engine never speaks HTTP itself. It reads current state with
//! [`RemoteApi::fetch`] and mutates it with [`RemoteApi::send`]; hosts
//! provide the transport, authentication and session handling.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// HTTP-style verb of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether the verb changes remote state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote inventory API consumed by the engine.
///
/// Implementations must be thread-safe (`Send + Sync`). Every call is
/// awaited by the engine before the next one is issued.
///
/// # Example
///
/// ```ignore
/// use converge_core::{RemoteApi, TransportError, Verb};
///
/// async fn remove(api: &dyn RemoteApi, id: &str) -> Result<(), TransportError> {
///     api.send(Verb::Delete, &format!("/api/widgets/{id}"), None).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Reads the current state served at `path`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` when the request fails or the body is not JSON.
    async fn fetch(&self, path: &str) -> Result<Value, TransportError>;

    /// Issues a mutating call and returns the decoded response body.
    ///
    /// `payload` is `None` for deletes. An empty response body decodes to
    /// `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` for connection failures and non-success statuses.
    async fn send(
        &self,
        verb: Verb,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, TransportError>;

    /// Short name of the backend for logs.
    fn backend_name(&self) -> &'static str;
}
