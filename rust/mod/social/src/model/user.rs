use serde::{Deserialize, Serialize};

use super::ImageRef;

/// A registered user. The password hash is stored alongside the record but
/// never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Unique handle, compared case-insensitively.
    pub username: String,

    /// Unique, stored lowercased.
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    #[serde(default)]
    pub bio: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<ImageRef>,

    /// Number of users following this user.
    #[serde(default)]
    pub follower_count: u64,

    /// Number of users this user follows.
    #[serde(default)]
    pub following_count: u64,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

/// Input for registering a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    /// Plain password; hashed before it reaches the store.
    pub password: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image: Option<ImageRef>,
}

/// Partial profile update. `None` and empty strings leave a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image: Option<ImageRef>,
}

/// Result of a profile update.
#[derive(Debug, Clone)]
pub struct ProfileChange {
    pub user: User,
    /// The image that was replaced, so the caller can release it at the
    /// hosting provider.
    pub replaced_image: Option<ImageRef>,
}
