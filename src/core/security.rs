use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::core::config::Settings;

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[error("jwt encoding failed")]
    JwtEncoding,
    #[error("jwt decoding failed")]
    JwtDecoding,
    #[error("unsupported jwt algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    Learner,
    Author,
}

/// Session claims minted by the external session service. `outcome_token`
/// authorizes the grade-recorder callback for this launch.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    pub(crate) role: Role,
    #[serde(default)]
    pub(crate) outcome_token: Option<String>,
    pub(crate) exp: i64,
}

pub(crate) fn verify_token(token: &str, settings: &Settings) -> Result<Claims, SecurityError> {
    let algorithm = algorithm_from_settings(settings)?;
    let validation = Validation::new(algorithm);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.security().secret_key.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| SecurityError::JwtDecoding)
}

#[cfg_attr(not(test), allow(dead_code))]
pub(crate) fn create_session_token(
    subject: &str,
    role: Role,
    outcome_token: Option<String>,
    settings: &Settings,
) -> Result<String, SecurityError> {
    let algorithm = algorithm_from_settings(settings)?;
    let expire = OffsetDateTime::now_utc() + Duration::hours(12);

    let claims =
        Claims { sub: subject.to_string(), role, outcome_token, exp: expire.unix_timestamp() };

    encode(
        &jsonwebtoken::Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(settings.security().secret_key.as_bytes()),
    )
    .map_err(|_| SecurityError::JwtEncoding)
}

fn algorithm_from_settings(settings: &Settings) -> Result<Algorithm, SecurityError> {
    match settings.security().algorithm.as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(SecurityError::UnsupportedAlgorithm(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_claims() {
        let settings = Settings::for_tests();
        let token = create_session_token(
            "user-1",
            Role::Learner,
            Some("outcome-abc".to_string()),
            &settings,
        )
        .expect("token");

        let claims = verify_token(&token, &settings).expect("claims");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Learner);
        assert_eq!(claims.outcome_token.as_deref(), Some("outcome-abc"));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let settings = Settings::for_tests();
        let token =
            create_session_token("user-1", Role::Author, None, &settings).expect("token");
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(verify_token(&tampered, &settings).is_err());
    }
}
