use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{}", identity_message(.0))]
    Identity(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - session may have expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Identity service API key is not configured")]
    MissingApiKey,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// `{"error": {"code": 400, "message": "EMAIL_NOT_FOUND"}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Map an identity service failure. The service reports most failures as
    /// 400 with an error code in the body; those become `Identity`.
    pub fn from_identity_response(status: reqwest::StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) if status.as_u16() != 429 => ApiError::Identity(envelope.error.message),
            _ => Self::from_status(status, body),
        }
    }

    /// True if the failure means the credential is no longer accepted.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ApiError::Unauthorized => true,
            ApiError::Identity(code) => matches!(
                identity_code(code),
                "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN"
            ),
            _ => false,
        }
    }
}

/// Codes may carry a suffix: "WEAK_PASSWORD : Password should be at least 6 characters".
fn identity_code(raw: &str) -> &str {
    raw.split(" : ").next().unwrap_or(raw).trim()
}

/// User-facing text for identity service error codes.
pub fn identity_message(raw: &str) -> String {
    let message = match identity_code(raw) {
        "EMAIL_NOT_FOUND" => "No account found for that email",
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => "Invalid email or password",
        "USER_DISABLED" => "This account has been disabled",
        "EMAIL_EXISTS" => "An account with that email already exists",
        "INVALID_EMAIL" => "That email address is not valid",
        "MISSING_PASSWORD" => "Password is required",
        "WEAK_PASSWORD" => "Password should be at least 6 characters",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later.",
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
            "Session expired. Please log in again."
        }
        "USER_NOT_FOUND" => "Account no longer exists",
        "OPERATION_NOT_ALLOWED" => "Password sign-in is disabled for this project",
        _ => return raw.to_string(),
    };
    message.to_string()
}
