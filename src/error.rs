//! Error taxonomy shared by the gateway, the cache and the mutation layer.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// A non-2xx response from the remote store, surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote store returned {status}: {body}")]
pub struct RemoteError {
  pub status: u16,
  pub body: String,
}

/// Everything that can go wrong while talking to the remote store.
#[derive(Debug, Error)]
pub enum GatewayError {
  #[error(transparent)]
  Remote(#[from] RemoteError),
  #[error("transport failure: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),
  #[error("invalid URL: {0}")]
  Url(#[from] url::ParseError),
  #[error("{entity} {id} not found")]
  NotFound { entity: &'static str, id: String },
  /// A cached value did not have the type requested for its key.
  #[error("cached value for {key} has an unexpected type")]
  TypeMismatch { key: String },
}

impl GatewayError {
  /// HTTP status of the underlying failure, if the store answered at all.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Remote(remote) => Some(remote.status),
      Self::Transport(e) => e.status().map(|s| s.as_u16()),
      Self::NotFound { .. } => Some(404),
      Self::Decode(_) | Self::Url(_) | Self::TypeMismatch { .. } => None,
    }
  }
}

/// A failed fetch as stored inside a cache entry.
///
/// Cloneable so that every caller attached to the same in-flight request
/// observes the identical error.
#[derive(Debug, Clone, Error)]
#[error("fetch failed: {cause}")]
pub struct FetchError {
  cause: Arc<GatewayError>,
}

impl FetchError {
  pub fn new(cause: GatewayError) -> Self {
    Self {
      cause: Arc::new(cause),
    }
  }

  pub fn cause(&self) -> &GatewayError {
    &self.cause
  }

  /// Whether both errors come from the same settled request.
  pub fn same_as(&self, other: &FetchError) -> bool {
    Arc::ptr_eq(&self.cause, &other.cause)
  }
}

impl From<GatewayError> for FetchError {
  fn from(cause: GatewayError) -> Self {
    Self::new(cause)
  }
}

/// Which write a [`MutationError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
  Create,
  Update,
  Delete,
  UpdateStatus,
  CreateCompany,
  UpdateCompany,
}

impl fmt::Display for MutationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Create => "create trip",
      Self::Update => "update trip",
      Self::Delete => "delete trip",
      Self::UpdateStatus => "update trip status",
      Self::CreateCompany => "create company",
      Self::UpdateCompany => "update company",
    };
    f.write_str(name)
  }
}

/// A failed write. The cache is left exactly as it was before the attempt.
#[derive(Debug, Error)]
#[error("{operation} failed: {cause}")]
pub struct MutationError {
  pub operation: MutationKind,
  #[source]
  pub cause: GatewayError,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_remote_error_message() {
    let err = GatewayError::from(RemoteError {
      status: 409,
      body: "duplicate key".to_string(),
    });
    assert_eq!(err.to_string(), "remote store returned 409: duplicate key");
    assert_eq!(err.status(), Some(409));
  }

  #[test]
  fn test_fetch_error_clones_share_cause() {
    let err = FetchError::new(GatewayError::NotFound {
      entity: "trip",
      id: "t-1".to_string(),
    });
    let clone = err.clone();
    assert!(err.same_as(&clone));
    assert_eq!(clone.to_string(), "fetch failed: trip t-1 not found");
  }

  #[test]
  fn test_mutation_error_names_operation() {
    let err = MutationError {
      operation: MutationKind::UpdateStatus,
      cause: GatewayError::NotFound {
        entity: "trip",
        id: "t-9".to_string(),
      },
    };
    assert_eq!(
      err.to_string(),
      "update trip status failed: trip t-9 not found"
    );
  }
}
