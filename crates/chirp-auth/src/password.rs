use anyhow::{Result, bail};
use pbkdf2::pbkdf2_hmac;
use rand_core::{OsRng, RngCore};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::AuthConfig;

fn stretch(digest_alg: &str, password: &str, salt: &[u8], iterations: u32, out: &mut [u8]) -> bool {
    match digest_alg {
        "sha256" => pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, out),
        "sha512" => pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, iterations, out),
        _ => return false,
    }
    true
}

/// Derive a storable key blob: `alg::salt_hex::digest_hex::iterations`.
pub(crate) fn derive(config: &AuthConfig, password: &str) -> Result<String> {
    let mut salt = vec![0u8; config.pbkdf2_key_length];
    OsRng.fill_bytes(&mut salt);

    let mut digest = vec![0u8; config.pbkdf2_key_length];
    if !stretch(
        &config.pbkdf2_digest,
        password,
        &salt,
        config.pbkdf2_iterations,
        &mut digest,
    ) {
        bail!("unsupported pbkdf2 digest: {}", config.pbkdf2_digest);
    }

    let parts = [
        config.pbkdf2_digest.clone(),
        hex::encode(salt),
        hex::encode(digest),
        config.pbkdf2_iterations.to_string(),
    ];

    Ok(parts.join(&config.pbkdf2_delimiter))
}

/// Re-derive with the parameters embedded in the blob and compare in
/// constant time. Any parse failure verifies as false.
pub(crate) fn verify(config: &AuthConfig, password: &str, password_key: &str) -> bool {
    let parts: Vec<&str> = password_key.split(config.pbkdf2_delimiter.as_str()).collect();
    let [alg, salt_hex, digest_hex, iterations] = parts.as_slice() else {
        debug!("malformed password key blob");
        return false;
    };

    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };

    // The stored digest length wins over the configured one, so blobs
    // written under an older config still verify.
    let mut derived = vec![0u8; expected.len()];
    if !stretch(alg, password, &salt, iterations, &mut derived) {
        debug!("unknown digest {alg} in password key blob");
        return false;
    }

    derived.ct_eq(&expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            pbkdf2_iterations: 1000,
            ..AuthConfig::default()
        }
    }

    #[test]
    fn blob_has_the_expected_shape() {
        let config = config();
        let blob = derive(&config, "pw1").unwrap();
        let parts: Vec<&str> = blob.split("::").collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "sha512");
        assert_eq!(parts[1].len(), config.pbkdf2_key_length * 2);
        assert_eq!(parts[2].len(), config.pbkdf2_key_length * 2);
        assert_eq!(parts[3], "1000");
    }

    #[test]
    fn salts_are_fresh_per_derivation() {
        let config = config();
        assert_ne!(
            derive(&config, "pw1").unwrap(),
            derive(&config, "pw1").unwrap()
        );
    }

    #[test]
    fn verify_accepts_only_the_original_password() {
        let config = config();
        let blob = derive(&config, "correct horse").unwrap();

        assert!(verify(&config, "correct horse", &blob));
        assert!(!verify(&config, "battery staple", &blob));
    }

    #[test]
    fn verify_honors_embedded_parameters_over_config() {
        let old = AuthConfig {
            pbkdf2_digest: "sha256".into(),
            pbkdf2_iterations: 500,
            pbkdf2_key_length: 32,
            ..AuthConfig::default()
        };
        let blob = derive(&old, "pw1").unwrap();

        // A service running newer defaults still verifies the old blob.
        assert!(verify(&config(), "pw1", &blob));
    }

    #[test]
    fn malformed_blobs_fail_closed() {
        let config = config();
        assert!(!verify(&config, "pw1", ""));
        assert!(!verify(&config, "pw1", "sha512::zz::zz::notanumber"));
        assert!(!verify(&config, "pw1", "md5::aa::bb::1000"));
    }
}
