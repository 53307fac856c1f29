//! Path id extractors.
//!
//! A path segment that is not a number does not reject the request: it
//! resolves to [`INVALID_ID`], which every lookup then reports as not found.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::warn;

use crate::domain::INVALID_ID;

/// `:channel` path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelId(pub i64);

/// `:podcast` path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PodcastId(pub i64);

/// Parse a numeric path segment, falling back to the sentinel id
pub fn parse_id(param: &str, value: &str) -> i64 {
    match value.parse::<i64>() {
        Ok(id) => id,
        Err(e) => {
            warn!(param, value, error = %e, "Malformed id in path");
            INVALID_ID
        }
    }
}

async fn path_id<S: Send + Sync>(parts: &mut Parts, state: &S, param: &str) -> i64 {
    match Path::<HashMap<String, String>>::from_request_parts(parts, state).await {
        Ok(Path(params)) => match params.get(param) {
            Some(value) => parse_id(param, value),
            None => INVALID_ID,
        },
        Err(e) => {
            warn!(param, error = %e, "Unreadable path parameters");
            INVALID_ID
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ChannelId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(path_id(parts, state, "channel").await))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for PodcastId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(path_id(parts, state, "podcast").await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("channel", "42"), 42);
        assert_eq!(parse_id("channel", "abc"), INVALID_ID);
        assert_eq!(parse_id("channel", ""), INVALID_ID);
        assert_eq!(parse_id("podcast", "99999999999999999999"), INVALID_ID);
    }
}
