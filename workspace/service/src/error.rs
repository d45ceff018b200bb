use thiserror::Error;

/// Error types for the service layer
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Error from password hashing or verification
    #[error("Password digest error: {0}")]
    PasswordDigest(#[from] bcrypt::BcryptError),

    /// A referenced record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Registration with an email that already belongs to a user
    #[error("User with email {0} already exists")]
    EmailTaken(String),

    /// Login with an unknown email or a wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Login attempted against a banned account
    #[error("This account is banned")]
    UserBanned,

    /// The caller is not allowed to perform this operation
    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// A rejected upload (no usable image, too many images)
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

/// Type alias for Result with ServiceError
pub type Result<T> = std::result::Result<T, ServiceError>;
