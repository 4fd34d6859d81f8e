//! Token validation capability

use crate::claims::AccessTokenClaims;
use crate::permission::PermissionAction;
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use thiserror::Error;
use tracing::debug;

/// Why a token failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The token is invalid or lacks the required permission
    #[error("{0}")]
    Rejected(String),

    /// Validation could not be performed (key fetch, remote service, ...)
    #[error("{0}")]
    Unavailable(String),
}

/// Checks a bearer token against a required scope
///
/// Implementations are shared by every in-flight call and must not block
/// the executor.
#[async_trait]
pub trait TokenValidator: Send + Sync + 'static {
    async fn validate(
        &self,
        token: &str,
        resource: &str,
        action: PermissionAction,
        namespace: &str,
    ) -> Result<(), ValidationError>;
}

/// Validates JWT access tokens against a local key
///
/// The token must be correctly signed and unexpired, and carry a
/// `permissions` entry whose resource matches the required one (after
/// `{namespace}` substitution) with all required action bits.
pub struct JwtTokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenValidator {
    /// RS256 with a PEM encoded public key
    pub fn from_rsa_pem(public_key_pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            key: DecodingKey::from_rsa_pem(public_key_pem)?,
            validation: Validation::new(Algorithm::RS256),
        })
    }

    /// HS256 with a shared secret
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Clock skew tolerance for `exp`, in seconds
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.validation.leeway = seconds;
        self
    }
}

impl std::fmt::Debug for JwtTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenValidator")
            .field("algorithms", &self.validation.algorithms)
            .finish()
    }
}

#[async_trait]
impl TokenValidator for JwtTokenValidator {
    async fn validate(
        &self,
        token: &str,
        resource: &str,
        action: PermissionAction,
        namespace: &str,
    ) -> Result<(), ValidationError> {
        let data = decode::<AccessTokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| ValidationError::Rejected(format!("invalid token: {e}")))?;

        let required = resource.replace("{namespace}", namespace);
        let granted = data
            .claims
            .permissions
            .iter()
            .any(|permission| permission.grants(&required, action));

        if !granted {
            return Err(ValidationError::Rejected(format!(
                "insufficient permissions: {action} on '{required}' required"
            )));
        }

        debug!(resource = %required, action = %action, "Token validated");
        Ok(())
    }
}
