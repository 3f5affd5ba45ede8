use std::future::{ready, Ready};

use actix_web::http::header::{self, HeaderMap};
use actix_web::{dev, web, FromRequest, HttpRequest};

use anyhow::Context;

use secrecy::{ExposeSecret, Secret};

use crate::error::RestError;

const BEARER_AUTH_PREFIX: &str = "Bearer ";

/// Shared secret guarding operator endpoints. Unset means open access.
#[derive(Debug, Clone, Default)]
pub struct OperatorSecret(Option<Secret<String>>);

impl OperatorSecret {
    pub fn new(secret: Option<Secret<String>>) -> Self {
        Self(secret.filter(|secret| !secret.expose_secret().is_empty()))
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Check the bearer token of a request against the secret
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), RestError> {
        let secret = match &self.0 {
            Some(secret) => secret,
            None => return Ok(()),
        };

        match bearer_token(headers) {
            Ok(token) if token == secret.expose_secret() => Ok(()),
            Ok(_) => {
                tracing::warn!("Operator token mismatch");
                Err(RestError::Unauthorized)
            }
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Missing operator token");
                Err(RestError::Unauthorized)
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> anyhow::Result<&str> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .context("Missing authorization in header")?
        .to_str()?;

    header_value
        .strip_prefix(BEARER_AUTH_PREFIX)
        .context("Authorization scheme not bearer")
}

/// Request guard for operator-only endpoints
#[derive(Debug)]
pub struct Operator;

impl FromRequest for Operator {
    type Error = RestError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        // Missing registration means no secret was configured
        let result = match req.app_data::<web::Data<OperatorSecret>>() {
            Some(secret) => secret.authorize(req.headers()).map(|_| Operator),
            None => Ok(Operator),
        };
        ready(result)
    }
}
