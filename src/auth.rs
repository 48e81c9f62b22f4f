use crate::config::AuthConfig;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// Single-account credential check plus an in-process store of short-lived
/// opaque bearer tokens. Expired entries are pruned lazily on issue.
pub struct TokenStore {
    email: String,
    password_sha256: String,
    ttl_secs: u64,
    tokens: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl TokenStore {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            email: cfg.email.clone(),
            password_sha256: cfg.password_sha256.to_lowercase(),
            ttl_secs: cfg.token_ttl_secs,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    pub fn verify_credentials(&self, email: &str, password: &str) -> bool {
        let digest = hex::encode(Sha256::digest(password.as_bytes()));
        email == self.email && digest == self.password_sha256
    }

    pub async fn login(&self, email: &str, password: &str) -> Option<IssuedToken> {
        if !self.verify_credentials(email, password) {
            return None;
        }
        let token = self.issue_at(Utc::now()).await;
        info!(email = %self.email, "issued access token");
        Some(token)
    }

    pub async fn issue_at(&self, now: DateTime<Utc>) -> IssuedToken {
        let mut bytes = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let access_token = hex::encode(bytes);

        let expires_at = now + Duration::seconds(self.ttl_secs as i64);
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, expiry| *expiry > now);
        tokens.insert(access_token.clone(), expires_at);

        IssuedToken {
            access_token,
            token_type: "Bearer",
            expires_in: self.ttl_secs,
        }
    }

    pub async fn is_valid(&self, token: &str) -> bool {
        self.is_valid_at(token, Utc::now()).await
    }

    pub async fn is_valid_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.tokens
            .read()
            .await
            .get(token)
            .map(|expiry| *expiry > now)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TokenStore {
        TokenStore::new(&AuthConfig {
            email: "admin@example.com".to_string(),
            // SHA-256 of "password"
            password_sha256: "5E884898DA28047151D0E56F8DC6292773603D0D6AABBDD62A11EF721D1542D8"
                .to_string(),
            token_ttl_secs: 60,
        })
    }

    #[test]
    fn credentials_verify_case_insensitive_digest() {
        let store = store();
        assert!(store.verify_credentials("admin@example.com", "password"));
        assert!(!store.verify_credentials("admin@example.com", "wrong"));
        assert!(!store.verify_credentials("other@example.com", "password"));
    }

    #[tokio::test]
    async fn login_round_trip() {
        let store = store();
        let token = store
            .login("admin@example.com", "password")
            .await
            .expect("valid credentials");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 60);
        assert!(store.is_valid(&token.access_token).await);

        assert!(store.login("admin@example.com", "nope").await.is_none());
    }

    #[tokio::test]
    async fn tokens_expire_after_ttl() {
        let store = store();
        let now = Utc::now();
        let token = store.issue_at(now).await;

        assert!(store.is_valid_at(&token.access_token, now).await);
        let later = now + Duration::seconds(61);
        assert!(!store.is_valid_at(&token.access_token, later).await);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let store = store();
        assert!(!store.is_valid("deadbeef").await);
    }
}
