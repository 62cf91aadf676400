use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    models::usermodel::{CurrentUser, UserRole},
};

/// Claims issued by the auth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contractor_id: Option<Uuid>,
    pub iat: usize,
    pub exp: usize,
}

/// Tokens are minted by the auth provider; this signer only backs the tests.
#[cfg(test)]
pub fn create_token(
    user: &CurrentUser,
    secret: &[u8],
    expires_in_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user.email.trim().is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = chrono::Utc::now();
    let claims = TokenClaims {
        sub: user.email.clone(),
        name: user.display_name.clone(),
        role: user.role,
        contractor_id: user.contractor_id,
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::minutes(expires_in_minutes)).timestamp() as usize,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret),
    )
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<CurrentUser, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(token) => Ok(CurrentUser {
            email: token.claims.sub,
            display_name: token.claims.name,
            role: token.claims.role,
            contractor_id: token.claims.contractor_id,
        }),
        Err(_) => Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn test_token_round_trip_keeps_contractor_link() {
        let id = Uuid::new_v4();
        let user = CurrentUser::new("pat@example.com", "Pat", UserRole::Contractor).with_contractor_id(id);

        let token = create_token(&user, SECRET, 60).unwrap();
        let decoded = decode_token(token, SECRET).unwrap();

        assert_eq!(decoded, user);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let user = CurrentUser::new("a@example.com", "Alice", UserRole::Tenant);
        let token = create_token(&user, SECRET, 60).unwrap();

        let err = decode_token(token, b"other-secret").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let user = CurrentUser::new("a@example.com", "Alice", UserRole::Tenant);
        let token = create_token(&user, SECRET, -10).unwrap();

        assert!(decode_token(token, SECRET).is_err());
    }

    #[test]
    fn test_empty_subject_is_refused() {
        let user = CurrentUser::new("  ", "Nobody", UserRole::Tenant);
        assert!(create_token(&user, SECRET, 60).is_err());
    }
}
