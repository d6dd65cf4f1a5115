//! Password keys and bearer tokens.
//!
//! Passwords are stored as salted PBKDF2 blobs; sessions are asserted
//! with short-lived ES256 JWTs. Signing keys come from the environment
//! and their absence is a startup error, never a runtime fallback.

pub mod keys;
mod password;
mod token;

use anyhow::{Context, Result};
use jsonwebtoken::{DecodingKey, EncodingKey};

pub use token::Claims;

pub const PRIVATE_KEY_ENV: &str = "CHIRP_JWT_PRIVATE_KEY";
pub const PUBLIC_KEY_ENV: &str = "CHIRP_JWT_PUBLIC_KEY";

/// Tunables for key derivation and token lifetime. None of these are
/// secrets; they are baked into each password blob so old blobs remain
/// verifiable after a config change.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub pbkdf2_digest: String,
    pub pbkdf2_iterations: u32,
    pub pbkdf2_key_length: usize,
    pub pbkdf2_delimiter: String,
    pub token_leeway_secs: u64,
    pub access_token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pbkdf2_digest: "sha512".into(),
            pbkdf2_iterations: 100_000,
            pbkdf2_key_length: 64,
            pbkdf2_delimiter: "::".into(),
            token_leeway_secs: 5 * 60,
            access_token_ttl_secs: 2 * 60 * 60,
        }
    }
}

pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Build the service from PEM key material.
    pub fn new(config: AuthConfig, private_pem: &[u8], public_pem: &[u8]) -> Result<Self> {
        let encoding_key =
            EncodingKey::from_ec_pem(private_pem).context("invalid ES256 private key")?;
        let decoding_key =
            DecodingKey::from_ec_pem(public_pem).context("invalid ES256 public key")?;

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
        })
    }

    /// Build the service from the `CHIRP_JWT_*` environment variables,
    /// which hold base64-encoded PEM. Fails fast when either is missing.
    pub fn from_env(config: AuthConfig) -> Result<Self> {
        let private_pem = keys::pem_from_env(PRIVATE_KEY_ENV)?;
        let public_pem = keys::pem_from_env(PUBLIC_KEY_ENV)?;
        Self::new(config, &private_pem, &public_pem)
    }

    /// Derive a fresh storable key blob for a password. The result embeds
    /// the algorithm, salt and iteration count; it must never be logged.
    pub fn derive_password_key(&self, password: &str) -> Result<String> {
        password::derive(&self.config, password)
    }

    /// Check a password against a stored blob. Malformed blobs and
    /// unknown digest names verify as false rather than erroring.
    pub fn verify_password(&self, password: &str, password_key: &str) -> bool {
        password::verify(&self.config, password, password_key)
    }

    /// Issue a signed access token for a user id.
    pub fn issue_token(&self, user_id: &str) -> Result<String> {
        token::issue(
            &self.encoding_key,
            user_id,
            self.config.access_token_ttl_secs,
        )
    }

    /// Verify a token and that it was issued for `user_id`. Any failure
    /// (signature, expiry, shape) is reported as false.
    pub fn verify_token(&self, user_id: &str, token: &str) -> bool {
        token::verify(
            &self.decoding_key,
            user_id,
            token,
            self.config.token_leeway_secs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(config: AuthConfig) -> AuthService {
        let (private_pem, public_pem) = keys::generate_keypair().unwrap();
        AuthService::new(config, private_pem.as_bytes(), public_pem.as_bytes()).unwrap()
    }

    #[test]
    fn password_round_trip() {
        let auth = service(AuthConfig {
            pbkdf2_iterations: 1000,
            ..AuthConfig::default()
        });

        let blob = auth.derive_password_key("hunter2").unwrap();
        assert!(auth.verify_password("hunter2", &blob));
        assert!(!auth.verify_password("hunter3", &blob));
    }

    #[test]
    fn token_round_trip_and_subject_binding() {
        let auth = service(AuthConfig::default());

        let token = auth.issue_token("user-a").unwrap();
        assert!(auth.verify_token("user-a", &token));
        assert!(!auth.verify_token("user-b", &token));
        assert!(!auth.verify_token("user-a", "not.a.token"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = service(AuthConfig {
            access_token_ttl_secs: -600,
            token_leeway_secs: 0,
            ..AuthConfig::default()
        });

        let token = auth.issue_token("user-a").unwrap();
        assert!(!auth.verify_token("user-a", &token));
    }

    #[test]
    fn tokens_from_another_keypair_are_rejected() {
        let issuer = service(AuthConfig::default());
        let verifier = service(AuthConfig::default());

        let token = issuer.issue_token("user-a").unwrap();
        assert!(!verifier.verify_token("user-a", &token));
    }
}
