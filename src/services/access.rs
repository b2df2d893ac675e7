//! Gate in front of every mutating form submission.

use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::config::SecurityConfig;

const SESSION_KEY: &str = "admin";

#[derive(Debug, Clone)]
pub enum AccessGate {
    /// No admin password configured; every submission is allowed.
    Open,
    Protected { password_hash: String },
}

impl AccessGate {
    pub async fn from_config(config: &SecurityConfig) -> Result<Self> {
        if let Some(hash) = config.admin_password_hash.as_deref().filter(|h| !h.is_empty()) {
            PasswordHash::new(hash)
                .map_err(|e| anyhow::anyhow!("Invalid admin_password_hash: {e}"))?;
            return Ok(Self::Protected {
                password_hash: hash.to_string(),
            });
        }

        if let Some(password) = config.admin_password.clone().filter(|p| !p.is_empty()) {
            let password_hash = task::spawn_blocking(move || hash_password(&password))
                .await
                .context("Password hashing task panicked")??;
            return Ok(Self::Protected { password_hash });
        }

        Ok(Self::Open)
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub async fn verify(&self, password: &str) -> Result<bool> {
        let Self::Protected { password_hash } = self else {
            return Ok(true);
        };
        if password.is_empty() {
            return Ok(false);
        }

        let password_hash = password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    pub async fn session_authorized(&self, session: &Session) -> bool {
        if self.is_open() {
            return true;
        }
        matches!(session.get::<bool>(SESSION_KEY).await, Ok(Some(true)))
    }

    /// Allows a submission from a signed-in session, or one carrying the
    /// correct password (which then signs the session in).
    pub async fn authorize(&self, session: &Session, password: Option<&str>) -> Result<bool> {
        if self.session_authorized(session).await {
            return Ok(true);
        }

        let Some(password) = password else {
            return Ok(false);
        };

        if self.verify(password).await? {
            self.sign_in(session).await?;
            return Ok(true);
        }

        warn!("Rejected submission with wrong admin password");
        Ok(false)
    }

    pub async fn sign_in(&self, session: &Session) -> Result<()> {
        session.cycle_id().await.context("Failed to rotate session id")?;
        session
            .insert(SESSION_KEY, true)
            .await
            .context("Failed to store session")?;
        debug!("Admin session started");
        Ok(())
    }

    pub async fn sign_out(&self, session: &Session) -> Result<()> {
        session.flush().await.context("Failed to clear session")?;
        Ok(())
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
