//! Authorization failures
//!
//! Every failure is scoped to the current call and maps onto exactly one
//! gRPC status code. The messages are stable.

use thiserror::Error;
use tonic::Status;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `authorization` metadata entry
    #[error("no authorization token found")]
    MissingToken,

    /// Value is not `Bearer <token>`
    #[error("invalid authorization token format")]
    InvalidFormat,

    /// The token validator refused the token
    #[error("{0}")]
    Rejected(String),

    /// Claims could not be decoded from the token
    #[error("{0}")]
    InvalidClaims(String),

    /// Token belongs to a different namespace than this deployment
    #[error("'{claim}' does not match '{namespace}'")]
    NamespaceMismatch { claim: String, namespace: String },

    /// Unexpected fault while authorizing
    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    pub fn code(&self) -> tonic::Code {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidFormat
            | AuthError::Rejected(_)
            | AuthError::InvalidClaims(_) => tonic::Code::Unauthenticated,
            AuthError::NamespaceMismatch { .. } => tonic::Code::PermissionDenied,
            AuthError::Internal(_) => tonic::Code::Internal,
        }
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        Status::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_status_codes() {
        let status: Status = AuthError::MissingToken.into();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), "no authorization token found");

        let status: Status = AuthError::NamespaceMismatch {
            claim: "other".to_string(),
            namespace: "accelbyte".to_string(),
        }
        .into();
        assert_eq!(status.code(), Code::PermissionDenied);
        assert_eq!(status.message(), "'other' does not match 'accelbyte'");

        let status: Status = AuthError::Internal("boom".to_string()).into();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "boom");
    }
}
