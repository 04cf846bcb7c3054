//! Request identity verification.
//!
//! Only a signed, unexpired access token yields an identity. Anything a client could edit
//! without the signing key (a bare user id header, an unsigned cookie) is ignored.

use axum::http::{header, HeaderMap};

use crate::{
    types::UserId,
    utils::{
        cookies::{extract_cookie_value, ACCESS_COOKIE_NAME},
        jwt::verify_access_token,
    },
};

/// A verified caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

pub trait IdentityVerifier: Send + Sync {
    /// Verified identity carried by the request, if any.
    fn verify(&self, headers: &HeaderMap) -> Option<Identity>;
}

#[derive(Clone)]
pub struct JwtIdentityVerifier {
    secret: String,
}

impl JwtIdentityVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn verify(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = extract_token(headers)?;
        let claims = match verify_access_token(&token, &self.secret) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(error = %err, "Rejected access token");
                return None;
            }
        };
        match claims.sub.parse::<UserId>() {
            Ok(user_id) => Some(Identity { user_id }),
            Err(_) => {
                tracing::warn!(sub = %claims.sub, "Access token subject is not a user id");
                None
            }
        }
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if let Some(token) = auth_header.and_then(parse_bearer_token) {
        return Some(token.to_string());
    }
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| extract_cookie_value(raw, ACCESS_COOKIE_NAME))
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}
