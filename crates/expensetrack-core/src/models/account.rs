use serde::Deserialize;

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    pub token: String,
    pub user_id: String,
    pub email: String,
}

/// Account details returned by the identity service lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "localId", default)]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: bool,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "photoUrl", default)]
    pub photo_url: Option<String>,
}

impl UserProfile {
    /// A profile is complete once it has both a name and a photo.
    pub fn is_complete(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.display_name) && filled(&self.photo_url)
    }

    pub fn display_name_or_email(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or("")
    }
}
