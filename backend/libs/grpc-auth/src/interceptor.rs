//! Bearer token authorization
//!
//! Per call, outside the allow-list:
//! 1. the first `authorization` metadata entry must be `Bearer <token>`,
//! 2. the token validator must accept the token for the configured
//!    resource, action and namespace,
//! 3. the token's claims must decode, and a non-empty `extend_namespace`
//!    claim must equal the configured namespace.
//!
//! On success the claims are stored in the request extensions.

use crate::claims::{parse_access_token, AccessTokenClaims};
use crate::error::AuthError;
use crate::permission::PermissionAction;
use crate::validator::{TokenValidator, ValidationError};
use async_trait::async_trait;
use futures::FutureExt;
use grpc_app::{CallDetails, CallResult, Next, ServerInterceptor};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tonic::metadata::MetadataMap;
use tracing::{debug, warn};

/// Methods that bypass authorization
pub const ALLOWED_METHODS: [&str; 3] = [
    "/grpc.health.v1.Health/Check",
    "/grpc.health.v1.Health/Watch",
    "/grpc.reflection.v1alpha.ServerReflection/ServerReflectionInfo",
];

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone)]
pub struct AuthorizationInterceptor {
    resource: String,
    action: PermissionAction,
    namespace: String,
    validator: Arc<dyn TokenValidator>,
}

impl AuthorizationInterceptor {
    pub fn new(
        resource: impl Into<String>,
        action: PermissionAction,
        namespace: impl Into<String>,
        validator: Arc<dyn TokenValidator>,
    ) -> Self {
        Self {
            resource: resource.into(),
            action,
            namespace: namespace.into(),
            validator,
        }
    }

    pub fn is_allowed_method(method: &str) -> bool {
        ALLOWED_METHODS.contains(&method)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Authorize a call from its metadata, returning the token's claims
    pub async fn authorize(&self, metadata: &MetadataMap) -> Result<AccessTokenClaims, AuthError> {
        let value = metadata
            .get("authorization")
            .ok_or(AuthError::MissingToken)?;
        let value = value.to_str().map_err(|_| AuthError::InvalidFormat)?;
        let token = value
            .strip_prefix(BEARER_PREFIX)
            .ok_or(AuthError::InvalidFormat)?;

        let validation = AssertUnwindSafe(self.validator.validate(
            token,
            &self.resource,
            self.action,
            &self.namespace,
        ))
        .catch_unwind()
        .await;

        match validation {
            Ok(Ok(())) => {}
            Ok(Err(ValidationError::Rejected(msg))) => return Err(AuthError::Rejected(msg)),
            Ok(Err(ValidationError::Unavailable(msg))) => return Err(AuthError::Internal(msg)),
            Err(panic) => return Err(AuthError::Internal(panic_message(panic.as_ref()))),
        }

        let claims = parse_access_token(token)?;

        if let Some(claim) = claims.extend_namespace() {
            if claim != self.namespace {
                return Err(AuthError::NamespaceMismatch {
                    claim: claim.to_string(),
                    namespace: self.namespace.clone(),
                });
            }
        }

        Ok(claims)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "token validator panicked".to_string()
    }
}

impl std::fmt::Debug for AuthorizationInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationInterceptor")
            .field("resource", &self.resource)
            .field("action", &self.action)
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[async_trait]
impl ServerInterceptor for AuthorizationInterceptor {
    fn name(&self) -> &str {
        "AuthorizationInterceptor"
    }

    async fn intercept(&self, mut call: CallDetails, next: Next) -> CallResult {
        if Self::is_allowed_method(call.method()) {
            return next.run(call).await;
        }

        match self.authorize(call.metadata()).await {
            Ok(claims) => {
                debug!(method = %call.method(), sub = ?claims.sub, "Call authorized");
                call.extensions_mut().insert(claims);
                next.run(call).await
            }
            Err(e) => {
                warn!(method = %call.method(), code = ?e.code(), error = %e, "Call rejected");
                Err(e.into())
            }
        }
    }
}
