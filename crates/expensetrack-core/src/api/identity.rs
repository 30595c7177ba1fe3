//! Client for the hosted identity service (Identity Toolkit REST API).
//!
//! Every call is a JSON `POST` to `{base}/accounts:{method}?key={api key}`.
//! Failures come back as `{"error": {"message": CODE}}` and are mapped to
//! `ApiError::Identity`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use super::http::{build_client, redact, send_with_backoff};
use super::ApiError;
use crate::auth::VerificationStatus;
use crate::models::{AuthSuccess, UserProfile};

/// Default base URL of the identity service.
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    id_token: String,
    local_id: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OobCodeRequest<'a> {
    request_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserProfile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
}

/// Fields to change on the account profile. Empty values are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: String,
    pub photo_url: String,
}

/// Identity service client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        Ok(Self::with_client(build_client()?, base_url, api_key))
    }

    /// Build a client sharing an existing connection pool.
    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self, method: &str) -> Result<String, ApiError> {
        let key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ApiError::MissingApiKey)?;
        Ok(format!("{}/accounts:{}?key={}", self.base_url, method, key))
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(method)?;
        let response = send_with_backoff(&url, || self.client.post(&url).json(body)).await?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to read response from {}", redact(&url)))?;

        if !status.is_success() {
            debug!(method, %status, "Identity request failed");
            return Err(ApiError::from_identity_response(status, &text).into());
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("accounts:{}: {}", method, e)).into())
    }

    async fn password_auth(&self, method: &str, email: &str, password: &str) -> Result<AuthSuccess> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: PasswordResponse = self.call(method, &request).await?;
        Ok(AuthSuccess {
            token: response.id_token,
            user_id: response.local_id,
            email: if response.email.is_empty() {
                email.to_string()
            } else {
                response.email
            },
        })
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSuccess> {
        let result = self.password_auth("signInWithPassword", email, password).await?;
        info!(user_id = %result.user_id, "Signed in");
        Ok(result)
    }

    /// Create an account and sign it in.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSuccess> {
        let result = self.password_auth("signUp", email, password).await?;
        info!(user_id = %result.user_id, "Account created");
        Ok(result)
    }

    /// Email a password reset link.
    pub async fn send_password_reset(&self, email: &str) -> Result<()> {
        let request = OobCodeRequest {
            request_type: "PASSWORD_RESET",
            email: Some(email),
            id_token: None,
        };
        let _: serde_json::Value = self.call("sendOobCode", &request).await?;
        info!("Password reset email requested");
        Ok(())
    }

    /// Email a verification link to the signed-in account.
    pub async fn send_email_verification(&self, token: &str) -> Result<()> {
        let request = OobCodeRequest {
            request_type: "VERIFY_EMAIL",
            email: None,
            id_token: Some(token),
        };
        let _: serde_json::Value = self.call("sendOobCode", &request).await?;
        info!("Verification email requested");
        Ok(())
    }

    /// Fetch the signed-in account's profile.
    pub async fn lookup(&self, token: &str) -> Result<UserProfile> {
        let response: LookupResponse = self.call("lookup", &TokenRequest { id_token: token }).await?;
        response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidResponse("lookup returned no users".to_string()).into())
    }

    /// Update display name and/or photo URL. Empty fields are not sent.
    pub async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<UserProfile> {
        fn non_empty(s: &str) -> Option<&str> {
            let s = s.trim();
            (!s.is_empty()).then_some(s)
        }
        let request = UpdateRequest {
            id_token: token,
            display_name: non_empty(&update.display_name),
            photo_url: non_empty(&update.photo_url),
            return_secure_token: true,
        };
        let response: UpdateResponse = self.call("update", &request).await?;
        info!("Profile updated");
        Ok(UserProfile {
            user_id: response.local_id,
            email: response.email,
            email_verified: false,
            display_name: response.display_name,
            photo_url: response.photo_url,
        })
    }
}

#[async_trait]
impl VerificationStatus for IdentityClient {
    async fn is_email_verified(&self, token: &str) -> Result<bool> {
        Ok(self.lookup(token).await?.email_verified)
    }
}
