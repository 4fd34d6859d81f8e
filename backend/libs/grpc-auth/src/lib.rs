//! Bearer token authorization for gRPC services
//!
//! - **AuthorizationInterceptor**: rejects calls without a valid bearer token
//!   scoped to the deployment's namespace
//! - **TokenValidator**: pluggable token check; `JwtTokenValidator` verifies
//!   locally signed JWTs and their `permissions` claim
//! - **ClaimsExt**: reads the authorized claims inside a handler
//!
//! ```rust,ignore
//! use grpc_app::InterceptorOption;
//! use grpc_auth::{AuthorizationInterceptor, JwtTokenValidator, PermissionAction};
//! use std::sync::Arc;
//!
//! let validator = Arc::new(JwtTokenValidator::from_rsa_pem(public_key_pem)?);
//! let interceptor = AuthorizationInterceptor::new(
//!     "ADMIN:NAMESPACE:{namespace}:PIRGRPCSERVICE:CONFIG",
//!     PermissionAction::READ | PermissionAction::UPDATE,
//!     "accelbyte",
//!     validator,
//! );
//! let option = InterceptorOption::new(interceptor);
//! ```

pub mod claims;
pub mod error;
pub mod extensions;
pub mod interceptor;
pub mod permission;
pub mod validator;

pub use claims::{parse_access_token, AccessTokenClaims};
pub use error::AuthError;
pub use extensions::ClaimsExt;
pub use interceptor::{AuthorizationInterceptor, ALLOWED_METHODS};
pub use permission::{Permission, PermissionAction};
pub use validator::{JwtTokenValidator, TokenValidator, ValidationError};
