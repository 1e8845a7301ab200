// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth flow: register, login, refresh, logout.
//!
//! ## Flow
//!
//! 1. **Register** validates the input shape, hashes the password, persists
//!    the identity and issues an access + refresh token pair.
//! 2. **Login** resolves the identifier (email if it contains `@`, otherwise
//!    username) and verifies the password. Unknown identity and wrong
//!    password fail with the same `InvalidCredentials`.
//! 3. **Refresh** trades a valid refresh token for a new access token. The
//!    refresh token itself is not rotated and stays valid until it expires or
//!    is revoked.
//! 4. **Logout** revokes a currently valid refresh token.

use std::sync::Arc;

use uuid::Uuid;

use super::password;
use super::refresh::{RawRefreshToken, RefreshTokenLedger};
use super::token::AccessTokenCodec;
use super::AuthError;
use crate::config::AuthSettings;
use crate::storage::{Identity, IdentityRepository, StoreError};
use crate::store::CredentialStore;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const EMAIL_MAX: usize = 254;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;

/// Input for registration.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Freshly issued access token.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Result of a successful register or login.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub identity: Identity,
    pub access: AccessGrant,
    pub refresh_token: RawRefreshToken,
}

#[derive(Clone)]
pub struct AuthService {
    store: CredentialStore,
    codec: Arc<AccessTokenCodec>,
    ledger: RefreshTokenLedger,
    settings: Arc<AuthSettings>,
}

impl AuthService {
    pub fn new(store: CredentialStore, codec: Arc<AccessTokenCodec>, settings: AuthSettings) -> Self {
        Self {
            ledger: RefreshTokenLedger::new(store.clone()),
            store,
            codec,
            settings: Arc::new(settings),
        }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<SessionTokens, AuthError> {
        let username = validate_username(&input.username)?.to_string();
        let email = validate_email(&input.email)?.to_string();
        validate_password(&input.password)?;

        let secret = input.password;
        let hash = run_blocking(move || password::hash_password(&secret)).await?;

        let identity = self
            .store
            .call(move |db| IdentityRepository::new(db).insert(&username, &email, &hash))
            .await?;

        self.open_session(identity).await
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<SessionTokens, AuthError> {
        let identifier = identifier.trim().to_string();
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "identifier and password are required".to_string(),
            ));
        }

        let found = self
            .store
            .call(move |db| {
                let repo = IdentityRepository::new(db);
                let lookup = if identifier.contains('@') {
                    repo.find_by_email(&identifier)
                } else {
                    repo.find_by_username(&identifier)
                };
                match lookup {
                    Ok(identity) => Ok(Some(identity)),
                    Err(StoreError::NotFound(_)) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;

        let stored_hash = found.as_ref().map(|identity| identity.password_hash.clone());
        let candidate = password.to_string();
        let matches = run_blocking(move || match stored_hash {
            Some(hash) => password::verify_password(&candidate, &hash),
            None => password::verify_password(&candidate, password::dummy_hash()?),
        })
        .await?;

        match found {
            Some(identity) if matches => self.open_session(identity).await,
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    pub async fn refresh(&self, presented: &str) -> Result<AccessGrant, AuthError> {
        let raw = RawRefreshToken::parse(presented)?;
        if !self.ledger.is_valid(&raw).await? {
            return Err(AuthError::InvalidToken);
        }
        let user_id = self
            .ledger
            .subject_of(&raw)
            .await
            .map_err(invalid_if_not_found)?;
        self.issue_access(user_id)
    }

    pub async fn logout(&self, presented: &str) -> Result<(), AuthError> {
        let raw = RawRefreshToken::parse(presented)?;
        if !self.ledger.is_valid(&raw).await? {
            return Err(AuthError::InvalidToken);
        }
        self.ledger.revoke(&raw).await.map_err(invalid_if_not_found)
    }

    /// Look up the caller's identity.
    pub async fn identity(&self, user_id: Uuid) -> Result<Identity, AuthError> {
        let identity = self
            .store
            .call(move |db| IdentityRepository::new(db).find_by_id(user_id))
            .await?;
        Ok(identity)
    }

    /// Change the caller's username and/or email.
    pub async fn update_identity(
        &self,
        user_id: Uuid,
        username: Option<String>,
        email: Option<String>,
    ) -> Result<Identity, AuthError> {
        if username.is_none() && email.is_none() {
            return Err(AuthError::InvalidInput(
                "at least one of username or email is required".to_string(),
            ));
        }
        let username = username
            .as_deref()
            .map(validate_username)
            .transpose()?
            .map(str::to_string);
        let email = email
            .as_deref()
            .map(validate_email)
            .transpose()?
            .map(str::to_string);

        let identity = self
            .store
            .call(move |db| {
                IdentityRepository::new(db).update(user_id, username.as_deref(), email.as_deref())
            })
            .await?;
        Ok(identity)
    }

    async fn open_session(&self, identity: Identity) -> Result<SessionTokens, AuthError> {
        let access = self.issue_access(identity.id)?;
        let refresh_token = self
            .ledger
            .issue_and_store(identity.id, self.settings.refresh_token_ttl)
            .await?;
        Ok(SessionTokens {
            identity,
            access,
            refresh_token,
        })
    }

    fn issue_access(&self, user_id: Uuid) -> Result<AccessGrant, AuthError> {
        let ttl = self.settings.access_token_ttl;
        Ok(AccessGrant {
            access_token: self.codec.issue(user_id, ttl)?,
            expires_in: ttl.as_secs(),
        })
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, AuthError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Internal(format!("password task failed: {e}")))?
}

fn invalid_if_not_found(err: AuthError) -> AuthError {
    match err {
        AuthError::NotFound(_) => AuthError::InvalidToken,
        other => other,
    }
}

/// 3-32 characters from `[A-Za-z0-9_.-]`. Never contains `@`, so login can
/// tell usernames and emails apart.
pub fn validate_username(username: &str) -> Result<&str, AuthError> {
    let username = username.trim();
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AuthError::InvalidInput(format!(
            "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AuthError::InvalidInput(
            "username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(username)
}

pub fn validate_email(email: &str) -> Result<&str, AuthError> {
    let email = email.trim();
    let invalid = || AuthError::InvalidInput("email address is invalid".to_string());

    if email.is_empty() || email.len() > EMAIL_MAX || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(AuthError::InvalidInput(format!(
            "password must be {PASSWORD_MIN}-{PASSWORD_MAX} characters"
        )));
    }
    Ok(())
}
