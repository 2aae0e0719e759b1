//! # pb-auth-simple
//!
//! Argon2-based implementation of `SessionIdentity`.
//! Accounts are kept in memory; the signed-in identity is pushed to
//! subscribers whenever it changes.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use pb_core::traits::SessionIdentity;
use pb_core::validation::{normalize_phone, validate_email};
use pb_core::{
    AppError, AuthorizationError, Identity, Result, TransportKind, UserId, UserProfile,
    ValidationError,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    profile: UserProfile,
    password_hash: String,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity {
            id: self.profile.id.clone(),
            email: self.profile.email.clone(),
            display_name: Some(self.profile.display_name.clone()),
        }
    }
}

pub struct SimpleSessionProvider {
    /// Keyed by lower-cased email.
    accounts: DashMap<String, Account>,
    current: watch::Sender<Option<Identity>>,
}

impl Default for SimpleSessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleSessionProvider {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: DashMap::new(),
            current,
        }
    }

    /// Registers an account and signs it in.
    pub fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        display_name: &str,
        phone: Option<&str>,
    ) -> Result<Identity> {
        let email = email.trim();
        validate_email(email)?;
        if password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::WeakPassword(MIN_PASSWORD_LEN).into());
        }
        let phone = phone.map(normalize_phone).transpose()?;

        let key = email.to_lowercase();
        if self.accounts.contains_key(&key) {
            return Err(duplicate(email));
        }
        let password_hash = hash_password(password)?;

        let account = Account {
            profile: UserProfile {
                id: UserId(Uuid::new_v4().simple().to_string()),
                email: email.to_string(),
                display_name: display_name.trim().to_string(),
                phone,
                created_at: Utc::now(),
            },
            password_hash,
        };
        let identity = account.identity();
        match self.accounts.entry(key) {
            Entry::Occupied(_) => return Err(duplicate(email)),
            Entry::Vacant(slot) => {
                slot.insert(account);
            }
        }

        info!(user = %identity.id, "account created");
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    pub fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity> {
        let identity = self
            .accounts
            .get(&email.trim().to_lowercase())
            .filter(|account| verify_password(password, &account.password_hash))
            .map(|account| account.identity());

        match identity {
            Some(identity) => {
                info!(user = %identity.id, "signed in");
                self.current.send_replace(Some(identity.clone()));
                Ok(identity)
            }
            None => {
                warn!("rejected sign-in");
                Err(AuthorizationError::InvalidCredentials.into())
            }
        }
    }

    pub fn sign_out(&self) {
        if self.current.send_replace(None).is_some() {
            info!("signed out");
        }
    }
}

impl SessionIdentity for SimpleSessionProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    fn profile(&self, user_id: &UserId) -> Option<UserProfile> {
        self.accounts
            .iter()
            .find(|account| &account.profile.id == user_id)
            .map(|account| account.profile.clone())
    }
}

fn duplicate(email: &str) -> AppError {
    AppError::Conflict(format!("an account for {email} already exists"))
}

fn hash_password(password: &SecretString) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::transport(TransportKind::Unknown, err.to_string()))
}

/// Verifies if a provided password matches a stored Argon2 hash.
fn verify_password(password: &SecretString, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
        .is_ok()
}
