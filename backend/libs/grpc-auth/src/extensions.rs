//! Access to authorized claims from service handlers

use crate::claims::AccessTokenClaims;
use tonic::{Request, Status};

/// Read the claims stored by [`AuthorizationInterceptor`](crate::AuthorizationInterceptor)
pub trait ClaimsExt {
    fn claims(&self) -> Option<&AccessTokenClaims>;

    /// Claims, or `Unauthenticated` when the call was not authorized
    fn require_claims(&self) -> Result<&AccessTokenClaims, Status> {
        self.claims()
            .ok_or_else(|| Status::unauthenticated("no authorized claims on request"))
    }
}

impl<T> ClaimsExt for Request<T> {
    fn claims(&self) -> Option<&AccessTokenClaims> {
        self.extensions().get::<AccessTokenClaims>()
    }
}
