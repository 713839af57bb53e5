use thiserror::Error;

/// Type alias for Result with GmailError
pub type Result<T> = std::result::Result<T, GmailError>;

/// Error types for the Gmail purge pipeline
#[derive(Error, Debug)]
pub enum GmailError {
    /// Gmail API returned an error without a usable status code
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Forbidden (403). Gmail also uses this for per-user rate limiting.
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Any other non-success HTTP status
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Conflicting or malformed run arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl GmailError {
    /// Build the error variant matching an HTTP status code
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => GmailError::RateLimitExceeded(message),
            404 => GmailError::MessageNotFound(message),
            400 => GmailError::BadRequest(message),
            403 => GmailError::Forbidden(message),
            500..=599 => GmailError::ServerError { status, message },
            _ => GmailError::HttpStatus { status, message },
        }
    }

    /// HTTP status carried by this error, if the remote call produced one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GmailError::RateLimitExceeded(_) => Some(429),
            GmailError::Forbidden(_) => Some(403),
            GmailError::MessageNotFound(_) => Some(404),
            GmailError::BadRequest(_) => Some(400),
            GmailError::ServerError { status, .. } | GmailError::HttpStatus { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

fn status_message(status: u16, detail: Option<&str>) -> String {
    let reason = hyper::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    match detail {
        Some(detail) if !detail.is_empty() => format!("HTTP {}: {} ({})", status, reason, detail),
        _ => format!("HTTP {}: {}", status, reason),
    }
}

/// Pull `error.code` and `error.message` out of a Google API error body
fn parse_error_body(value: &serde_json::Value) -> Option<(u16, Option<String>)> {
    let error = value.get("error")?;
    let code = error.get("code")?.as_u64()?;
    let status = u16::try_from(code).ok()?;
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string);
    Some((status, message))
}

impl From<google_gmail1::Error> for GmailError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            // HTTP response with status code and no JSON body
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status().as_u16();
                GmailError::from_status(status, status_message(status, None))
            }
            // Non-success response carrying a Google error document
            google_gmail1::Error::BadRequest(ref value) => match parse_error_body(value) {
                Some((status, detail)) => {
                    GmailError::from_status(status, status_message(status, detail.as_deref()))
                }
                None => GmailError::ApiError(value.to_string()),
            },
            // Network/connection errors
            google_gmail1::Error::HttpError(ref err) => {
                GmailError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => GmailError::NetworkError(err.to_string()),
            _ => GmailError::ApiError(error.to_string()),
        }
    }
}
