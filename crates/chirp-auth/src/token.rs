use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub(crate) fn issue(key: &EncodingKey, user_id: &str, ttl_secs: i64) -> Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + ttl_secs) as usize,
    };

    Ok(encode(&Header::new(Algorithm::ES256), &claims, key)?)
}

pub(crate) fn verify(key: &DecodingKey, user_id: &str, token: &str, leeway_secs: u64) -> bool {
    let mut validation = Validation::new(Algorithm::ES256);
    validation.leeway = leeway_secs;

    match decode::<Claims>(token, key, &validation) {
        Ok(data) => data.claims.sub == user_id,
        Err(e) => {
            debug!("token rejected: {e}");
            false
        }
    }
}
