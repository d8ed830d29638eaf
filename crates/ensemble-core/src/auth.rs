//! Outbound request authorization
//!
//! Meta and data nodes accept either HTTP basic auth or a short-lived HS512
//! bearer token signed with the cluster's shared secret. Callers pick one by
//! handing an [`Authorizer`] to the clients; [`authorizer_for`] derives the
//! right one from a [`Source`].

use crate::error::{CoreError, Result};
use crate::source::Source;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Lifetime of a freshly minted bearer token
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(60);

/// Adds credentials to an outbound request
pub trait Authorizer: Send + Sync {
    fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder>;
}

/// Leaves requests untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthorization;

impl Authorizer for NoAuthorization {
    fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        Ok(req)
    }
}

/// HTTP basic authentication
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl Authorizer for BasicAuth {
    fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        Ok(req.basic_auth(&self.username, Some(&self.password)))
    }
}

/// Bearer token claims understood by meta and data nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// HS512 bearer token signed with a shared secret, minted per request
#[derive(Debug, Clone)]
pub struct BearerJwt {
    pub username: String,
    pub shared_secret: String,
}

impl BearerJwt {
    pub fn token(&self) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| CoreError::Authorization(format!("System clock before epoch: {}", e)))?
            .as_secs();

        let claims = Claims {
            username: self.username.clone(),
            exp: now + TOKEN_LIFETIME.as_secs(),
        };

        encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(self.shared_secret.as_bytes()),
        )
        .map_err(|e| CoreError::Authorization(format!("Failed to sign token: {}", e)))
    }
}

impl Authorizer for BearerJwt {
    fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        Ok(req.bearer_auth(self.token()?))
    }
}

/// Choose the authorizer a source asks for: a shared secret wins over
/// basic credentials, and a source without a username sends nothing.
pub fn authorizer_for(src: &Source) -> Arc<dyn Authorizer> {
    if !src.shared_secret.is_empty() {
        Arc::new(BearerJwt {
            username: src.username.clone(),
            shared_secret: src.shared_secret.clone(),
        })
    } else if !src.username.is_empty() {
        Arc::new(BasicAuth {
            username: src.username.clone(),
            password: src.password.clone(),
        })
    } else {
        Arc::new(NoAuthorization)
    }
}
