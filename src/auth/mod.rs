pub mod password;
pub mod token;

use thiserror::Error;

pub type AuthResult<T> = core::result::Result<T, AuthError>;

/// Authentication and authorization failures surfaced to clients.
///
/// `InvalidToken` deliberately collapses the expired/malformed distinction
/// made by [`token::TokenError`]; the finer-grained cause is logged where the
/// collapse happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("access token required")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("account no longer exists")]
    PrincipalNotFound,

    // Opaque on purpose: never reveals whether the email or password was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    DuplicateIdentity,

    #[error("access denied for this role")]
    Forbidden,
}
