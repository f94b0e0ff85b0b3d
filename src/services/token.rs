// src/services/token.rs

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Claims, TokenKind},
};

const RESET_TOKEN_MINUTES: i64 = 30;

/// Emite e verifica os tokens de acesso, refresh e reset de senha.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, algorithm: Algorithm, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::Reset => Duration::minutes(RESET_TOKEN_MINUTES),
        }
    }

    pub fn mint(&self, user_id: Uuid, kind: TokenKind, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id,
            exp: (now + self.ttl(kind)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            typ: kind,
        };

        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?)
    }

    pub fn mint_access(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AppError> {
        self.mint(user_id, TokenKind::Access, now)
    }

    pub fn mint_refresh(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AppError> {
        self.mint(user_id, TokenKind::Refresh, now)
    }

    /// Qualquer falha (assinatura, algoritmo, tipo, expiração) vira `InvalidToken`.
    pub fn verify(&self, token: &str, expected: TokenKind, now: DateTime<Utc>) -> Result<Claims, AppError> {
        let mut validation = Validation::new(self.algorithm);
        // A expiração é conferida contra o relógio injetado, não o do sistema
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| AppError::InvalidToken)?;

        let claims = data.claims;
        if claims.typ != expected || claims.exp <= now.timestamp() || claims.sub.is_nil() {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }
}

/// Algoritmos simétricos aceitos na configuração.
pub fn parse_symmetric_algorithm(raw: &str) -> Option<Algorithm> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret", Algorithm::HS256, Duration::minutes(30), Duration::days(7))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn access_token_round_trip_within_ttl() {
        let user_id = Uuid::new_v4();
        let token = codec().mint_access(user_id, t0()).unwrap();
        let claims = codec()
            .verify(&token, TokenKind::Access, t0() + Duration::minutes(29))
            .unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn access_token_fails_after_ttl() {
        let token = codec().mint_access(Uuid::new_v4(), t0()).unwrap();
        let result = codec().verify(&token, TokenKind::Access, t0() + Duration::minutes(31));
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let token = codec().mint_refresh(Uuid::new_v4(), t0()).unwrap();
        assert!(codec().verify(&token, TokenKind::Access, t0()).is_err());
        assert!(codec().verify(&token, TokenKind::Refresh, t0() + Duration::days(6)).is_ok());
    }

    #[test]
    fn tokens_minted_in_same_second_differ() {
        let user_id = Uuid::new_v4();
        let a = codec().mint_access(user_id, t0()).unwrap();
        let b = codec().mint_access(user_id, t0()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = codec().mint_access(Uuid::new_v4(), t0()).unwrap();
        let other = TokenCodec::new("other", Algorithm::HS256, Duration::minutes(30), Duration::days(7));
        assert!(other.verify(&token, TokenKind::Access, t0()).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(codec().verify("not-a-jwt", TokenKind::Access, t0()).is_err());
    }

    #[test]
    fn only_hmac_algorithms_are_accepted() {
        assert_eq!(parse_symmetric_algorithm("hs512"), Some(Algorithm::HS512));
        assert_eq!(parse_symmetric_algorithm("RS256"), None);
    }
}
