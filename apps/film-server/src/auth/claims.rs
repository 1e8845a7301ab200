// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (identity id)
    pub sub: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Unique token id, so two tokens issued in the same second differ
    pub jti: String,

    /// Token kind, always `access`
    pub typ: String,
}

/// Authenticated user resolved from a verified access token.
///
/// The auth middleware inserts this into request extensions; handlers read
/// it through the `Auth` extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Identity id (`sub` claim)
    pub user_id: Uuid,
}

impl AuthenticatedUser {
    /// Build from already-verified claims.
    pub fn from_claims(claims: &AccessClaims) -> Option<Self> {
        Some(Self {
            user_id: Uuid::parse_str(&claims.sub).ok()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims(sub: String) -> AccessClaims {
        AccessClaims {
            sub,
            iat: 1700000000,
            exp: 1700003600,
            jti: Uuid::new_v4().to_string(),
            typ: "access".to_string(),
        }
    }

    #[test]
    fn from_claims_extracts_user_id() {
        let id = Uuid::new_v4();
        let user = AuthenticatedUser::from_claims(&sample_claims(id.to_string())).unwrap();
        assert_eq!(user.user_id, id);
    }

    #[test]
    fn from_claims_rejects_non_uuid_subject() {
        assert!(AuthenticatedUser::from_claims(&sample_claims("user_123".to_string())).is_none());
    }
}
