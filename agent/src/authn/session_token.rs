//! Backend access token

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user id)
    pub sub: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    /// Expiration timestamp
    pub exp: i64,

    #[serde(default)]
    pub iat: Option<i64>,
}

/// An access token and its decoded claims
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub raw: SecretString,
    pub claims: SessionClaims,
}

impl SessionToken {
    /// Decode the claims of a JWT.
    ///
    /// The signature is not checked; the backend verifies it on every call.
    pub fn from_raw(raw: String) -> Result<Self, AgentError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<SessionClaims>(&raw, &DecodingKey::from_secret(b""), &validation)
            .map_err(|e| AgentError::TokenError(format!("Failed to decode token: {}", e)))?;

        Ok(Self {
            raw: SecretString::from(raw),
            claims: token_data.claims,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }

    pub fn is_expired(&self) -> bool {
        self.claims.exp < Utc::now().timestamp()
    }

    /// Check if the token expires within the given number of seconds
    pub fn expires_within(&self, seconds: i64) -> bool {
        self.claims.exp < Utc::now().timestamp() + seconds
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.exp, 0).unwrap_or_else(Utc::now)
    }

    pub fn time_until_expiry(&self) -> i64 {
        self.claims.exp - Utc::now().timestamp()
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(sub: &str, exp: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = SessionClaims {
        sub: sub.to_string(),
        email: Some(format!("{}@example.com", sub)),
        role: Some("authenticated".to_string()),
        exp,
        iat: Some(exp - 3600),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
}
