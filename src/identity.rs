use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
    RequestPartsExt, TypedHeader,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use tap::TapFallible;
use time::OffsetDateTime;

use crate::error::{Error, UnauthorizedType};

/// A caller whose bearer token checked out.
#[derive(Debug, Clone)]
pub struct Identity {
    pub email: String,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, Error>;
}

#[derive(Clone)]
pub struct IdentityClient(pub Arc<dyn IdentityVerifier>);

impl std::ops::Deref for IdentityClient {
    type Target = dyn IdentityVerifier;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccessClaims {
    pub email: String,
    pub exp: i64,
}

impl AccessClaims {
    pub fn is_expired(&self) -> bool {
        self.exp < OffsetDateTime::now_utc().unix_timestamp()
    }
}

pub struct JwtVerifier {
    validation: jsonwebtoken::Validation,
    decoding_key: jsonwebtoken::DecodingKey,
}

impl JwtVerifier {
    pub fn new(decoding_key: jsonwebtoken::DecodingKey) -> Self {
        let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::RS256);
        // expiry is checked manually against the claim in verify()
        validation.validate_exp = false;

        Self {
            validation,
            decoding_key,
        }
    }

    pub fn new_from_env() -> Self {
        let public_key = std::env::var("JWT_PUBLIC_KEY")
            .expect("Missing required environment variable: JWT_PUBLIC_KEY");
        let public_key = general_purpose::STANDARD
            .decode(public_key)
            .expect("JWT_PUBLIC_KEY must be base64 encoded");
        let decoding_key = jsonwebtoken::DecodingKey::from_rsa_pem(&public_key)
            .expect("JWT_PUBLIC_KEY must be a PEM encoded RSA public key");

        Self::new(decoding_key)
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, Error> {
        let token =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
                .map_err(|_| Error::Unauthorized(UnauthorizedType::InvalidAccessToken))
                .tap_err(|_| tracing::debug!("bearer token failed verification"))?;

        if token.claims.is_expired() {
            return Err(Error::Unauthorized(UnauthorizedType::InvalidAccessToken))
                .tap_err(|_| tracing::debug!("bearer token is expired"));
        }

        Ok(Identity {
            email: token.claims.email,
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    IdentityClient: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(token)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::Unauthorized(UnauthorizedType::MissingAuthorization))
            .tap_err(|_| tracing::debug!("request without a usable bearer header"))?;

        let verifier = IdentityClient::from_ref(state);

        verifier.verify(token.token()).await
    }
}
