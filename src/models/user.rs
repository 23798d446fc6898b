use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::post::Upload;
use crate::entities::user;

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default)]
    #[serde(skip_serializing)]
    pub password2: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default, deserialize_with = "checkbox")]
    pub remember_me: bool,
}

/// HTML checkboxes submit "y", "on", "true" or nothing at all.
fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(matches!(
        raw.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("y" | "yes" | "on" | "true" | "1")
    ))
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Account fields accepted by registration, after form validation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Profile edit as submitted; unchanged fields are compared against the
/// stored user before uniqueness checks run.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: Option<Upload>,
}

/// Form values echoed back into the edit-profile template.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileFormView {
    pub username: String,
    pub email: String,
    pub bio: String,
}

impl From<&user::Model> for ProfileFormView {
    fn from(user: &user::Model) -> Self {
        ProfileFormView {
            username: user.username.clone(),
            email: user.email.clone(),
            bio: user.bio.clone().unwrap_or_default(),
        }
    }
}

impl From<&ProfileEdit> for ProfileFormView {
    fn from(edit: &ProfileEdit) -> Self {
        ProfileFormView {
            username: edit.username.clone(),
            email: edit.email.clone(),
            bio: edit.bio.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub id: i64,
    pub username: String,
    pub avatar: String,
}

impl From<&user::Model> for AuthorView {
    fn from(user: &user::Model) -> Self {
        AuthorView {
            id: user.id,
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// A user as listed in search results and on profile pages.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserView {
    fn from(user: user::Model) -> Self {
        UserView {
            id: user.id,
            username: user.username,
            email: user.email,
            bio: user.bio,
            avatar: user.avatar,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub is_following: bool,
    pub is_self: bool,
}
