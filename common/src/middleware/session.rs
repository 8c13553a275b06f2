//! Session token extraction.
//!
//! The token is read from the `x-session-token` header, falling back to the
//! `console_session` cookie. How it got there is up to the client.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, header::HeaderName, request::Parts, HeaderMap},
};

use crate::models::SessionToken;

/// Header carrying the session token.
pub static SESSION_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-session-token");

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "console_session";

/// The session token sent with a request, if any.
#[derive(Debug, Clone, Default)]
pub struct SessionHeader(pub Option<SessionToken>);

impl SessionHeader {
    pub fn token(&self) -> Option<&SessionToken> {
        self.0.as_ref()
    }

    /// Reads the token from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let from_header = headers
            .get(&SESSION_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(SessionToken::from);

        Self(from_header.or_else(|| token_from_cookies(headers)))
    }
}

fn token_from_cookies(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| SessionToken::from(value))
}

impl<S> FromRequestParts<S> for SessionHeader
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
