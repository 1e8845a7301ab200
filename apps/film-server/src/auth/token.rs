// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stateless access tokens (HS256 JWT).
//!
//! Verification is purely computational: signature plus expiry, no store
//! lookup. A token is expired once `now >= exp`, with no clock-skew leeway.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::claims::AccessClaims;
use super::AuthError;

/// `typ` claim carried by every access token.
const ACCESS_TOKEN_TYPE: &str = "access";

/// Issues and verifies access tokens with a shared HMAC secret.
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AccessTokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub", "iat"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a token for `subject` that expires `ttl` from now.
    pub fn issue(&self, subject: Uuid, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| AuthError::Internal("access token ttl out of range".to_string()))?;

        let claims = AccessClaims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
            jti: Uuid::new_v4().to_string(),
            typ: ACCESS_TOKEN_TYPE.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("sign access token: {e}")))
    }

    /// Verify signature and expiry and return the decoded claims.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let claims = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::Unauthenticated)?
            .claims;

        if claims.exp <= Utc::now().timestamp() || claims.typ != ACCESS_TOKEN_TYPE {
            return Err(AuthError::Unauthenticated);
        }
        Ok(claims)
    }

    /// Verify a token and return its subject.
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        let claims = self.decode(token)?;
        Uuid::parse_str(&claims.sub).map_err(|_| AuthError::Unauthenticated)
    }
}
