use axum::http::{header, HeaderMap};

pub mod admin;
pub mod health;
pub mod images;
pub mod products;
pub mod users;

/// Extract the bearer token from the Authorization header, if any.
///
/// Anything that is not a well-formed `Bearer <token>` value counts as
/// anonymous; handlers never reject a request just for a malformed header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
