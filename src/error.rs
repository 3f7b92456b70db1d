use thiserror::Error;

/// Error taxonomy shared by all schoolcomm clients.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (credentials, test user fields, ...)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Token exchange against the identity provider failed
    #[error("authentication error: {0}")]
    Authentication(String),

    /// No matching remote resource (e.g. no event for an iCalUId)
    #[error("not found: {0}")]
    NotFound(String),

    /// Network or connection failure talking to a remote service
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote service rejected the request with a status it published
    /// a message for
    #[error("remote error {code}: {message}")]
    Remote { code: i32, message: String },

    /// SMTP transport failure
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Building the mail message failed (headers, parts)
    #[error("mail build error: {0}")]
    MailBuild(#[from] lettre::error::Error),

    /// A mail address could not be parsed
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// A remote payload could not be parsed
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Local file access failed (attachments)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse(err.to_string())
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::MalformedResponse(err.to_string())
    }
}

/// Type alias for Result with the schoolcomm error type
pub type Result<T> = std::result::Result<T, Error>;
