use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Identity baked into an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 access tokens from a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid, name: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) if matches!(err.kind(), ErrorKind::ExpiredSignature) => Err(JwtError::Expired),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(ttl: Duration) -> TokenSigner {
        TokenSigner::new(b"test-secret", ttl)
    }

    #[test]
    fn issued_token_verifies_and_carries_identity() {
        let signer = signer(Duration::hours(1));
        let user_id = Uuid::new_v4();

        let token = signer.issue(user_id, "alice").unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.name, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = signer(Duration::minutes(-5));
        let token = signer.issue(Uuid::new_v4(), "alice").unwrap();

        assert!(matches!(signer.verify(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let signer = signer(Duration::hours(1));
        let other = TokenSigner::new(b"other-secret", Duration::hours(1));

        let token = other.issue(Uuid::new_v4(), "mallory").unwrap();
        assert!(matches!(signer.verify(&token), Err(JwtError::Invalid(_))));
    }
}
