use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use convene_shared::constants::ACTOR_HEADER;
use convene_shared::UserId;

use crate::error::ServerError;

/// The acting user, read from the `x-actor-id` header.
///
/// Whatever session layer fronts the service is expected to set the header
/// after authenticating the caller.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<UserId>().ok())
            .map(Actor)
            .ok_or(ServerError::Unauthenticated)
    }
}
