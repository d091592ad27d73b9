//! Token Issuer
//!
//! Mints and verifies RS256 access/refresh tokens. Signing uses the private
//! key, verification only the public key. Expiry is checked against the
//! caller's clock rather than the library's, so an expired token is reported
//! as [`AuthError::TokenExpired`] and never confused with a bad signature.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::domain::entity::token_claims::TokenClaims;
use crate::domain::value_object::{
    session_id::SessionId, token_type::TokenType, user_id::UserId, user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

/// Claims as they appear on the wire
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    /// User id
    sub: String,
    /// Session id
    sid: String,
    role: UserRole,
    typ: TokenType,
    iat: i64,
    exp: i64,
    nbf: i64,
    iss: String,
    aud: String,
    jti: String,
}

/// Who a token is minted for
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub role: UserRole,
}

/// Signed token plus the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at
    }
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        Self::from_pem(
            config.jwt_private_key_pem.as_bytes(),
            config.jwt_public_key_pem.as_bytes(),
            &config.jwt_issuer,
            &config.jwt_audience,
        )
    }

    pub fn from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        issuer: &str,
        audience: &str,
    ) -> AuthResult<Self> {
        let encoding = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| AuthError::KeyConfiguration(format!("private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| AuthError::KeyConfiguration(format!("public key: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        // Time claims are checked in `validate` against the injected clock
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        Ok(Self {
            encoding,
            decoding,
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            validation,
        })
    }

    /// Sign a token valid from `now` until `expires_at`
    ///
    /// Timestamps are whole seconds; the returned claims reflect that.
    pub fn issue(
        &self,
        subject: TokenSubject,
        token_type: TokenType,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let iat = now.timestamp();
        let exp = expires_at.timestamp();
        let jti = Uuid::new_v4();

        let wire = JwtClaims {
            sub: subject.user_id.to_string(),
            sid: subject.session_id.to_string(),
            role: subject.role,
            typ: token_type,
            iat,
            exp,
            nbf: iat,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: jti.to_string(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &wire, &self.encoding)
            .map_err(AuthError::TokenSigning)?;

        Ok(IssuedToken {
            token,
            claims: TokenClaims {
                user_id: subject.user_id,
                session_id: subject.session_id,
                role: subject.role,
                token_type,
                issued_at: timestamp(iat)?,
                expires_at: timestamp(exp)?,
                token_id: jti,
            },
        })
    }

    /// Verify signature, issuer, audience, type and expiry
    ///
    /// A token of the wrong type is rejected before expiry is considered.
    pub fn validate(
        &self,
        token: &str,
        expected: TokenType,
        now: DateTime<Utc>,
    ) -> AuthResult<TokenClaims> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AuthError::TokenInvalid
            })?;
        let wire = data.claims;

        if wire.typ != expected {
            return Err(AuthError::InvalidTokenType);
        }

        let now_secs = now.timestamp();
        if now_secs < wire.nbf {
            return Err(AuthError::TokenInvalid);
        }
        if now_secs >= wire.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(TokenClaims {
            user_id: UserId::parse_str(&wire.sub).map_err(|_| AuthError::TokenInvalid)?,
            session_id: SessionId::parse_str(&wire.sid).map_err(|_| AuthError::TokenInvalid)?,
            role: wire.role,
            token_type: wire.typ,
            issued_at: timestamp(wire.iat)?,
            expires_at: timestamp(wire.exp)?,
            token_id: Uuid::parse_str(&wire.jti).map_err(|_| AuthError::TokenInvalid)?,
        })
    }

    pub fn validate_access(&self, token: &str, now: DateTime<Utc>) -> AuthResult<TokenClaims> {
        self.validate(token, TokenType::Access, now)
    }

    pub fn validate_refresh(&self, token: &str, now: DateTime<Utc>) -> AuthResult<TokenClaims> {
        self.validate(token, TokenType::Refresh, now)
    }
}

fn timestamp(secs: i64) -> AuthResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(AuthError::TokenInvalid)
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{OTHER_PRIVATE_PEM, PRIVATE_PEM, PUBLIC_PEM};
    use chrono::Duration;

    fn issuer() -> TokenIssuer {
        TokenIssuer::from_pem(PRIVATE_PEM.as_bytes(), PUBLIC_PEM.as_bytes(), "iss", "aud").unwrap()
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: UserId::new(),
            session_id: SessionId::new(),
            role: UserRole::Admin,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let subject = subject();
        let now = Utc::now();
        let issued = issuer
            .issue(subject, TokenType::Access, now, now + Duration::minutes(15))
            .unwrap();

        let claims = issuer.validate_access(&issued.token, now).unwrap();
        assert_eq!(claims.user_id, subject.user_id);
        assert_eq!(claims.session_id, subject.session_id);
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired(now));
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn test_token_type_enforcement() {
        let issuer = issuer();
        let now = Utc::now();
        let refresh = issuer
            .issue(subject(), TokenType::Refresh, now, now + Duration::days(7))
            .unwrap();
        let access = issuer
            .issue(subject(), TokenType::Access, now, now + Duration::minutes(15))
            .unwrap();

        assert!(matches!(
            issuer.validate_access(&refresh.token, now),
            Err(AuthError::InvalidTokenType)
        ));
        assert!(matches!(
            issuer.validate_refresh(&access.token, now),
            Err(AuthError::InvalidTokenType)
        ));
    }

    #[test]
    fn test_expired_is_distinct_from_invalid() {
        let issuer = issuer();
        let now = Utc::now();
        let issued = issuer
            .issue(subject(), TokenType::Access, now, now + Duration::minutes(15))
            .unwrap();

        assert!(matches!(
            issuer.validate_access(&issued.token, now + Duration::minutes(15)),
            Err(AuthError::TokenExpired)
        ));

        let mut tampered = issued.token.clone();
        tampered.pop();
        tampered.push(if issued.token.ends_with('A') { 'B' } else { 'A' });
        assert!(matches!(
            issuer.validate_access(&tampered, now),
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            issuer.validate_access("garbage", now),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn test_foreign_key_and_issuer_rejected() {
        let now = Utc::now();
        let foreign = TokenIssuer::from_pem(
            OTHER_PRIVATE_PEM.as_bytes(),
            PUBLIC_PEM.as_bytes(),
            "iss",
            "aud",
        )
        .unwrap();
        let forged = foreign
            .issue(subject(), TokenType::Access, now, now + Duration::minutes(5))
            .unwrap();
        assert!(matches!(
            issuer().validate_access(&forged.token, now),
            Err(AuthError::TokenInvalid)
        ));

        let other_iss =
            TokenIssuer::from_pem(PRIVATE_PEM.as_bytes(), PUBLIC_PEM.as_bytes(), "evil", "aud")
                .unwrap();
        let token = other_iss
            .issue(subject(), TokenType::Access, now, now + Duration::minutes(5))
            .unwrap();
        assert!(matches!(
            issuer().validate_access(&token.token, now),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn test_not_yet_valid() {
        let issuer = issuer();
        let now = Utc::now();
        let issued = issuer
            .issue(subject(), TokenType::Access, now, now + Duration::minutes(15))
            .unwrap();
        assert!(matches!(
            issuer.validate_access(&issued.token, now - Duration::minutes(1)),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn test_each_issuance_is_unique() {
        let issuer = issuer();
        let subject = subject();
        let now = Utc::now();
        let a = issuer
            .issue(subject, TokenType::Refresh, now, now + Duration::days(7))
            .unwrap();
        let b = issuer
            .issue(subject, TokenType::Refresh, now, now + Duration::days(7))
            .unwrap();
        assert_ne!(a.token, b.token);
        assert!(a.token.len() >= 32);
    }

    #[test]
    fn test_bad_key_material() {
        let err = TokenIssuer::from_pem(b"nope", PUBLIC_PEM.as_bytes(), "iss", "aud").unwrap_err();
        assert_eq!(err.code(), "INVALID_KEY_CONFIGURATION");
    }
}
