//! Domain errors
//!
//! One closed taxonomy for the whole identity core. Callers match on the
//! variant; transports map [`ErrorKind`] to their own status codes and use
//! [`DomainError::public_message`] for anything shown to end users.

use sso_security::{JwtError, PasswordError};
use thiserror::Error;

/// Coarse classification of a [`DomainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Authentication,
    Authorization,
    Invariant,
    Internal,
}

#[derive(Error, Debug)]
pub enum DomainError {
    // ---- validation -------------------------------------------------------
    #[error("Invalid slug format: lowercase letters, digits and hyphens, 3-63 characters")]
    InvalidSlug,

    #[error("Invalid domain format")]
    InvalidDomain,

    #[error("Tenant name is required")]
    InvalidTenantName,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid role")]
    InvalidRole,

    #[error("Invalid password: length must be between {min} and {max} characters")]
    InvalidPassword { min: usize, max: usize },

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Invalid tenant identifier")]
    InvalidTenantHint,

    #[error("Tenant identification required")]
    TenantRequired,

    // ---- conflict ---------------------------------------------------------
    #[error("Tenant slug already exists: {0}")]
    TenantSlugAlreadyExists(String),

    #[error("Tenant domain already exists: {0}")]
    TenantDomainAlreadyExists(String),

    #[error("Email already exists for this tenant: {0}")]
    EmailAlreadyExists(String),

    #[error("User limit reached for current plan")]
    TenantMaxUsersReached,

    #[error("Reset token already used")]
    ResetTokenUsed,

    // ---- not found --------------------------------------------------------
    #[error("Tenant not found")]
    TenantNotFound,

    #[error("User not found")]
    UserNotFound,

    // ---- authentication ---------------------------------------------------
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User account is disabled")]
    AccountDisabled,

    #[error("Invalid or expired token")]
    InvalidAccessToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired")]
    TokenExpired,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    // ---- authorization ----------------------------------------------------
    #[error("Forbidden: insufficient permissions")]
    Forbidden,

    // ---- invariants -------------------------------------------------------
    #[error("Cannot delete or deactivate the last admin")]
    LastAdmin,

    #[error("Cannot delete your own account")]
    CannotDeleteSelf,

    // ---- internal ---------------------------------------------------------
    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        use DomainError::*;
        match self {
            InvalidSlug | InvalidDomain | InvalidTenantName | InvalidEmail | InvalidRole
            | InvalidPassword { .. } | WrongPassword | InvalidTenantHint | TenantRequired => {
                ErrorKind::Validation
            }
            TenantSlugAlreadyExists(_) | TenantDomainAlreadyExists(_) | EmailAlreadyExists(_)
            | TenantMaxUsersReached | ResetTokenUsed => ErrorKind::Conflict,
            TenantNotFound | UserNotFound => ErrorKind::NotFound,
            InvalidCredentials | AccountDisabled | InvalidAccessToken | InvalidRefreshToken
            | TokenExpired | InvalidResetToken => ErrorKind::Authentication,
            Forbidden => ErrorKind::Authorization,
            LastAdmin | CannotDeleteSelf => ErrorKind::Invariant,
            PasswordHashError(_) | TokenGenerationError(_) | DatabaseError(_)
            | InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        use DomainError::*;
        match self {
            InvalidSlug => "SLUG_INVALID",
            InvalidDomain => "DOMAIN_INVALID",
            InvalidTenantName => "TENANT_NAME_INVALID",
            InvalidEmail => "EMAIL_INVALID",
            InvalidRole => "ROLE_INVALID",
            InvalidPassword { .. } => "PASSWORD_INVALID",
            WrongPassword => "WRONG_PASSWORD",
            InvalidTenantHint => "TENANT_HINT_INVALID",
            TenantRequired => "TENANT_REQUIRED",
            TenantSlugAlreadyExists(_) => "SLUG_EXISTS",
            TenantDomainAlreadyExists(_) => "DOMAIN_EXISTS",
            EmailAlreadyExists(_) => "EMAIL_EXISTS",
            TenantMaxUsersReached => "USER_LIMIT_REACHED",
            ResetTokenUsed => "RESET_TOKEN_USED",
            TenantNotFound => "TENANT_NOT_FOUND",
            UserNotFound => "USER_NOT_FOUND",
            InvalidCredentials => "INVALID_CREDENTIALS",
            AccountDisabled => "ACCOUNT_DISABLED",
            InvalidAccessToken => "INVALID_TOKEN",
            InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            TokenExpired => "TOKEN_EXPIRED",
            InvalidResetToken => "INVALID_RESET_TOKEN",
            Forbidden => "FORBIDDEN",
            LastAdmin => "LAST_ADMIN",
            CannotDeleteSelf => "CANNOT_DELETE_SELF",
            PasswordHashError(_) | TokenGenerationError(_) | DatabaseError(_)
            | InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Code sent to callers. Refresh-token failures share one code so a
    /// response never tells a forged secret from a spent one.
    pub fn public_code(&self) -> &'static str {
        match self {
            DomainError::TokenExpired => DomainError::InvalidRefreshToken.code(),
            other => other.code(),
        }
    }

    /// Text safe to show to an unauthenticated caller.
    ///
    /// Internal details never leave the process, and refresh-token failures
    /// collapse into one message.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            ErrorKind::Authentication => match self {
                DomainError::InvalidRefreshToken | DomainError::TokenExpired => {
                    "Invalid or expired refresh token".to_string()
                }
                other => other.to_string(),
            },
            _ => self.to_string(),
        }
    }
}

impl From<PasswordError> for DomainError {
    fn from(err: PasswordError) -> Self {
        DomainError::PasswordHashError(err.to_string())
    }
}

impl From<JwtError> for DomainError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken => DomainError::InvalidAccessToken,
            JwtError::CreationError(msg) => DomainError::TokenGenerationError(msg),
        }
    }
}
