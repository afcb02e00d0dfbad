//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

/// Extractor for an optional `Authorization: Bearer` token.
///
/// A missing or malformed header yields `None`; the dispatcher decides
/// whether the action needs a caller.
pub struct OptionalBearer(pub Option<String>);

impl<S> FromRequestParts<S> for OptionalBearer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());
        Ok(OptionalBearer(token))
    }
}
