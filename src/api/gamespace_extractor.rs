use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::api::handlers::AppState;
use crate::model::Gamespace;
use crate::store::Store;

pub const GAMESPACE_HEADER: &str = "x-gamespace";

/// Axum extractor for the gamespace a request operates on.
///
/// Taken from the `X-Gamespace` header; requests without one fall back to
/// the gamespace configured for discovery.
#[async_trait]
impl<S> FromRequestParts<AppState<S>> for Gamespace
where
    S: Store + 'static,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let gamespace = extract_header_value(&parts.headers, GAMESPACE_HEADER)
            .unwrap_or_else(|| state.default_gamespace.clone());
        Ok(Gamespace::new(gamespace))
    }
}

/// Extract a non-empty header value as string
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
