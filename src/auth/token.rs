//! Signed access/refresh token issuance and verification.
//!
//! Access and refresh tokens are HS256 JWTs signed with *distinct* secrets,
//! so a leaked refresh secret cannot mint access tokens directly (and vice
//! versa). A `scope` claim backs up the secret split: even a token signed
//! with the right key is rejected when presented to the wrong verifier.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::PrincipalKind;
use crate::util::env::{EnvErr, Var};
use crate::var;

pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id within the store named by `kind`.
    pub sub: i32,
    pub kind: PrincipalKind,
    pub scope: TokenScope,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub type TokenResult<T> = core::result::Result<T, TokenError>;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Structurally valid and correctly signed, but past its expiry.
    #[error("token expired")]
    Expired,

    /// Bad signature, wrong scope, or garbage structure.
    #[error("malformed token")]
    Malformed,

    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Env(#[from] EnvErr),
}

#[derive(Clone)]
pub struct TokenIssuer {
    access_encode: EncodingKey,
    access_decode: DecodingKey,
    refresh_encode: EncodingKey,
    refresh_decode: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exact 15-minute / 7-day lifetimes; the default 60s leeway would
        // stretch them
        validation.leeway = 0;

        Self {
            access_encode: EncodingKey::from_secret(access_secret),
            access_decode: DecodingKey::from_secret(access_secret),
            refresh_encode: EncodingKey::from_secret(refresh_secret),
            refresh_decode: DecodingKey::from_secret(refresh_secret),
            validation,
        }
    }

    pub async fn from_env() -> TokenResult<Self> {
        let access = var!(Var::JwtAccessSecret).await?;
        let refresh = var!(Var::JwtRefreshSecret).await?;

        Ok(Self::new(access.as_bytes(), refresh.as_bytes()))
    }

    /// Mints a fresh access + refresh pair for the given principal.
    pub fn issue(&self, sub: i32, kind: PrincipalKind) -> TokenResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign(sub, kind, TokenScope::Access, ACCESS_TOKEN_TTL_SECS)?,
            refresh_token: self.sign(sub, kind, TokenScope::Refresh, REFRESH_TOKEN_TTL_SECS)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> TokenResult<Claims> {
        self.verify(token, TokenScope::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> TokenResult<Claims> {
        self.verify(token, TokenScope::Refresh)
    }

    /// Re-signs a fresh pair from a valid, unexpired refresh token.
    ///
    /// The presented refresh token stays valid until its own expiry; there is
    /// no server-side revocation list. Rotation never consults the credential
    /// store.
    pub fn rotate(&self, refresh_token: &str) -> TokenResult<TokenPair> {
        let claims = self.verify_refresh(refresh_token)?;
        self.issue(claims.sub, claims.kind)
    }

    fn sign(&self, sub: i32, kind: PrincipalKind, scope: TokenScope, ttl: i64) -> TokenResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub,
            kind,
            scope,
            iat: now,
            exp: now + ttl,
        };

        let key = match scope {
            TokenScope::Access => &self.access_encode,
            TokenScope::Refresh => &self.refresh_encode,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(TokenError::Signing)
    }

    fn verify(&self, token: &str, scope: TokenScope) -> TokenResult<Claims> {
        let key = match scope {
            TokenScope::Access => &self.access_decode,
            TokenScope::Refresh => &self.refresh_decode,
        };

        let claims = jsonwebtoken::decode::<Claims>(token, key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?
            .claims;

        if claims.scope != scope {
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-access-secret", b"test-refresh-secret")
    }

    #[test]
    fn issued_pair_verifies_and_decodes() {
        let issuer = issuer();
        let pair = issuer.issue(42, PrincipalKind::User).unwrap();

        let access = issuer.verify_access(&pair.access_token).unwrap();
        assert_eq!(access.sub, 42);
        assert_eq!(access.kind, PrincipalKind::User);
        assert_eq!(access.scope, TokenScope::Access);

        let refresh = issuer.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, 42);
        assert_eq!(refresh.kind, PrincipalKind::User);
        assert_eq!(refresh.exp - refresh.iat, REFRESH_TOKEN_TTL_SECS);
    }

    #[test]
    fn scopes_do_not_cross_verify() {
        let issuer = issuer();
        let pair = issuer.issue(7, PrincipalKind::Vendor).unwrap();

        assert!(matches!(
            issuer.verify_access(&pair.refresh_token),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            issuer.verify_refresh(&pair.access_token),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn expired_token_is_distinguished_from_malformed() {
        let issuer = issuer();
        let stale = issuer
            .sign(3, PrincipalKind::User, TokenScope::Access, -30)
            .unwrap();

        assert!(matches!(
            issuer.verify_access(&stale),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn tampered_token_is_malformed() {
        let issuer = issuer();
        let pair = issuer.issue(9, PrincipalKind::User).unwrap();

        let mut corrupted = pair.access_token.clone();
        // flip a character in the payload segment
        let payload_start = corrupted.find('.').unwrap() + 1;
        let byte = corrupted.as_bytes()[payload_start];
        let replacement = if byte == b'A' { 'B' } else { 'A' };
        corrupted.replace_range(payload_start..payload_start + 1, &replacement.to_string());

        assert!(matches!(
            issuer.verify_access(&corrupted),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn foreign_signature_is_malformed() {
        let ours = issuer();
        let theirs = TokenIssuer::new(b"other-access", b"other-refresh");
        let pair = theirs.issue(1, PrincipalKind::User).unwrap();

        assert!(matches!(
            ours.verify_access(&pair.access_token),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn rotate_preserves_principal_identity() {
        let issuer = issuer();
        let original = issuer.issue(77, PrincipalKind::Vendor).unwrap();

        let rotated = issuer.rotate(&original.refresh_token).unwrap();
        let claims = issuer.verify_access(&rotated.access_token).unwrap();

        assert_eq!(claims.sub, 77);
        assert_eq!(claims.kind, PrincipalKind::Vendor);

        // the old refresh token remains usable; rotation does not revoke it
        assert!(issuer.verify_refresh(&original.refresh_token).is_ok());
    }

    #[test]
    fn rotate_rejects_access_token() {
        let issuer = issuer();
        let pair = issuer.issue(5, PrincipalKind::User).unwrap();

        assert!(matches!(
            issuer.rotate(&pair.access_token),
            Err(TokenError::Malformed)
        ));
    }
}
