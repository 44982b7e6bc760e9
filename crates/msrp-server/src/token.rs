use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Tokens rotate every 12 hours; the previous window stays valid so a form
/// rendered just before rotation can still be submitted.
pub const TOKEN_WINDOW_SECS: u64 = 43_200;

const DEV_FALLBACK_SECRET: &str = "msrp-dev-form-token-secret";

/// Issues and checks the write tokens embedded in price form fields.
///
/// A token binds an action name and an owner ID to a time window, so a token
/// minted for one product's form cannot authorize a write to another.
#[derive(Debug, Clone)]
pub struct TokenKeeper {
    secret: Arc<String>,
}

impl TokenKeeper {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
        }
    }

    /// Builds a keeper from `MSRP_FORM_TOKEN_SECRET`.
    ///
    /// In development a fixed fallback secret keeps local setups working
    /// without configuration. Outside development a missing secret fails
    /// startup.
    ///
    /// # Errors
    ///
    /// Returns an error when the secret is unset outside development.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        match std::env::var("MSRP_FORM_TOKEN_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => Ok(Self::new(secret)),
            _ => {
                if is_development {
                    tracing::warn!(
                        "MSRP_FORM_TOKEN_SECRET not set; using the development fallback secret"
                    );
                    return Ok(Self::new(DEV_FALLBACK_SECRET));
                }

                anyhow::bail!(
                    "MSRP_FORM_TOKEN_SECRET is required outside development; set it to a random string"
                );
            }
        }
    }

    /// Issues a token for `action` on `owner_id` in the current window.
    #[must_use]
    pub fn issue(&self, action: &str, owner_id: i64) -> String {
        self.issue_at(action, owner_id, now_secs())
    }

    #[must_use]
    pub fn issue_at(&self, action: &str, owner_id: i64, now_secs: u64) -> String {
        self.digest(action, owner_id, now_secs / TOKEN_WINDOW_SECS)
    }

    /// Checks a submitted token against the current and previous windows.
    #[must_use]
    pub fn verify(&self, token: &str, action: &str, owner_id: i64) -> bool {
        self.verify_at(token, action, owner_id, now_secs())
    }

    #[must_use]
    pub fn verify_at(&self, token: &str, action: &str, owner_id: i64, now_secs: u64) -> bool {
        let window = now_secs / TOKEN_WINDOW_SECS;

        if constant_time_eq(&self.digest(action, owner_id, window), token) {
            return true;
        }

        match window.checked_sub(1) {
            Some(previous) => constant_time_eq(&self.digest(action, owner_id, previous), token),
            None => false,
        }
    }

    fn digest(&self, action: &str, owner_id: i64, window: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update([0u8]);
        hasher.update(action.as_bytes());
        hasher.update([0u8]);
        hasher.update(owner_id.to_le_bytes());
        hasher.update(window.to_le_bytes());
        hex_encode(&hasher.finalize())
    }
}

fn constant_time_eq(expected: &str, candidate: &str) -> bool {
    bool::from(expected.as_bytes().ct_eq(candidate.as_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    const TABLE: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(TABLE[(byte >> 4) as usize] as char);
        out.push(TABLE[(byte & 0x0f) as usize] as char);
    }
    out
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn keeper() -> TokenKeeper {
        TokenKeeper::new("unit-test-secret")
    }

    #[test]
    fn issued_token_verifies() {
        let keeper = keeper();
        let token = keeper.issue_at("save-product-price", 42, NOW);
        assert!(keeper.verify_at(&token, "save-product-price", 42, NOW));
    }

    #[test]
    fn token_is_bound_to_action() {
        let keeper = keeper();
        let token = keeper.issue_at("save-product-price", 42, NOW);
        assert!(!keeper.verify_at(&token, "save-variation-prices", 42, NOW));
    }

    #[test]
    fn token_is_bound_to_owner() {
        let keeper = keeper();
        let token = keeper.issue_at("save-product-price", 42, NOW);
        assert!(!keeper.verify_at(&token, "save-product-price", 43, NOW));
    }

    #[test]
    fn tampered_token_rejected() {
        let keeper = keeper();
        let mut token = keeper.issue_at("save-product-price", 42, NOW);
        token.replace_range(0..1, "x");
        assert!(!keeper.verify_at(&token, "save-product-price", 42, NOW));
    }

    #[test]
    fn previous_window_still_accepted() {
        let keeper = keeper();
        let token = keeper.issue_at("save-product-price", 42, NOW);
        assert!(keeper.verify_at(
            &token,
            "save-product-price",
            42,
            NOW + TOKEN_WINDOW_SECS
        ));
    }

    #[test]
    fn two_windows_back_rejected() {
        let keeper = keeper();
        let token = keeper.issue_at("save-product-price", 42, NOW);
        assert!(!keeper.verify_at(
            &token,
            "save-product-price",
            42,
            NOW + 2 * TOKEN_WINDOW_SECS
        ));
    }

    #[test]
    fn different_secret_rejects_token() {
        let token = keeper().issue_at("save-product-price", 42, NOW);
        let other = TokenKeeper::new("another-secret");
        assert!(!other.verify_at(&token, "save-product-price", 42, NOW));
    }

    #[test]
    fn token_is_lowercase_hex() {
        let token = keeper().issue_at("save-product-price", 42, NOW);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
