// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh token ledger.
//!
//! Raw tokens are 32 bytes from the OS CSPRNG, base64url-encoded without
//! padding. Only the SHA-256 hash is persisted, so validating a presented
//! token means re-hashing it and looking the hash up.
//!
//! Not-found, revoked and expired all collapse into "invalid" for callers.

use std::fmt;
use std::time::Duration;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::AuthError;
use crate::storage::{RefreshTokenRecord, RefreshTokenRepository, StoreError};
use crate::store::CredentialStore;

/// Number of random bytes in a raw refresh token.
const REFRESH_TOKEN_BYTES: usize = 32;

/// A raw refresh token as handed to (and presented by) the client.
#[derive(Clone, PartialEq, Eq)]
pub struct RawRefreshToken(String);

impl RawRefreshToken {
    fn generate() -> Result<Self, AuthError> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| AuthError::Internal("system RNG unavailable".to_string()))?;
        Ok(Self(Base64UrlUnpadded::encode_string(&bytes)))
    }

    /// Accept a presented token only if it decodes to exactly 32 bytes.
    pub fn parse(presented: &str) -> Result<Self, AuthError> {
        let mut buf = [0u8; REFRESH_TOKEN_BYTES];
        match Base64UrlUnpadded::decode(presented, &mut buf) {
            Ok(decoded) if decoded.len() == REFRESH_TOKEN_BYTES => Ok(Self(presented.to_string())),
            _ => Err(AuthError::InvalidToken),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Hex SHA-256 of the raw token, used as the storage key.
    pub fn hash(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Debug for RawRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawRefreshToken(<redacted>)")
    }
}

/// Issues, validates and revokes refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenLedger {
    store: CredentialStore,
}

impl RefreshTokenLedger {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    /// Generate a token, persist its hash and return the raw token.
    pub async fn issue_and_store(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<RawRefreshToken, AuthError> {
        let raw = RawRefreshToken::generate()?;
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| AuthError::Internal("refresh token ttl out of range".to_string()))?;
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Internal("refresh token expiry out of range".to_string()))?;

        let record = RefreshTokenRecord {
            token_hash: raw.hash(),
            user_id,
            issued_at: now,
            expires_at,
            revoked: false,
            revoked_at: None,
        };
        self.store
            .call(move |db| RefreshTokenRepository::new(db).insert(&record))
            .await
            .map_err(|e| AuthError::Internal(format!("store refresh token: {e}")))?;

        Ok(raw)
    }

    async fn find(&self, raw: &RawRefreshToken) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let hash = raw.hash();
        match self
            .store
            .call(move |db| RefreshTokenRepository::new(db).find(&hash))
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// True iff the token is known, not revoked and not expired.
    pub async fn is_valid(&self, raw: &RawRefreshToken) -> Result<bool, AuthError> {
        Ok(self
            .find(raw)
            .await?
            .is_some_and(|record| record.is_valid_at(Utc::now())))
    }

    /// Revoke a token. Revoking twice succeeds.
    ///
    /// # Errors
    /// `AuthError::NotFound` if the token was never issued.
    pub async fn revoke(&self, raw: &RawRefreshToken) -> Result<(), AuthError> {
        let hash = raw.hash();
        self.store
            .call(move |db| RefreshTokenRepository::new(db).mark_revoked(&hash))
            .await?;
        Ok(())
    }

    /// The identity a token was issued to, regardless of validity.
    pub async fn subject_of(&self, raw: &RawRefreshToken) -> Result<Uuid, AuthError> {
        self.find(raw)
            .await?
            .map(|record| record.user_id)
            .ok_or_else(|| AuthError::NotFound("refresh token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_STORE_TIMEOUT;

    const TWO_DAYS: Duration = Duration::from_secs(48 * 3600);

    fn temp_ledger() -> (RefreshTokenLedger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            CredentialStore::open(&dir.path().join("test.redb"), DEFAULT_STORE_TIMEOUT).unwrap();
        (RefreshTokenLedger::new(store), dir)
    }

    #[test]
    fn generated_tokens_are_well_formed_and_unique() {
        let first = RawRefreshToken::generate().unwrap();
        let second = RawRefreshToken::generate().unwrap();
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 43);
        assert!(RawRefreshToken::parse(first.as_str()).is_ok());
        assert_eq!(first.hash().len(), 64);
    }

    #[test]
    fn parse_rejects_malformed_tokens() {
        let too_long = "A".repeat(44);
        for bad in ["", "short", "not base64 at all!!", too_long.as_str()] {
            assert_eq!(RawRefreshToken::parse(bad), Err(AuthError::InvalidToken));
        }
    }

    #[test]
    fn debug_does_not_leak_token() {
        let raw = RawRefreshToken::generate().unwrap();
        assert!(!format!("{raw:?}").contains(raw.as_str()));
    }

    #[tokio::test]
    async fn valid_after_issue_invalid_after_revoke() {
        let (ledger, _dir) = temp_ledger();
        let user = Uuid::new_v4();
        let raw = ledger.issue_and_store(user, TWO_DAYS).await.unwrap();

        assert!(ledger.is_valid(&raw).await.unwrap());
        assert_eq!(ledger.subject_of(&raw).await.unwrap(), user);

        ledger.revoke(&raw).await.unwrap();
        assert!(!ledger.is_valid(&raw).await.unwrap());
        ledger.revoke(&raw).await.unwrap();
        assert_eq!(ledger.subject_of(&raw).await.unwrap(), user);
    }

    #[tokio::test]
    async fn expired_token_stays_invalid() {
        let (ledger, _dir) = temp_ledger();
        let raw = ledger
            .issue_and_store(Uuid::new_v4(), Duration::ZERO)
            .await
            .unwrap();

        for _ in 0..3 {
            assert!(!ledger.is_valid(&raw).await.unwrap());
        }
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        let raw = RawRefreshToken("abc".to_string());
        assert_eq!(
            raw.hash(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn unrepresentable_expiry_is_an_error() {
        let (ledger, _dir) = temp_ledger();
        let result = ledger
            .issue_and_store(Uuid::new_v4(), Duration::from_secs(10_000_000_000_000))
            .await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_revokes_all_succeed() {
        let (ledger, _dir) = temp_ledger();
        let raw = ledger.issue_and_store(Uuid::new_v4(), TWO_DAYS).await.unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                let raw = raw.clone();
                tokio::spawn(async move { ledger.revoke(&raw).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(!ledger.is_valid(&raw).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_token_is_invalid_and_not_found() {
        let (ledger, _dir) = temp_ledger();
        let raw = RawRefreshToken::generate().unwrap();

        assert!(!ledger.is_valid(&raw).await.unwrap());
        assert!(matches!(ledger.revoke(&raw).await, Err(AuthError::NotFound(_))));
        assert!(matches!(
            ledger.subject_of(&raw).await,
            Err(AuthError::NotFound(_))
        ));
    }
}
