//! User document schema
//!
//! Accounts are created by the external registration collaborator; this
//! service reads profiles, maintains stat counters, and toggles bookmarks.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Platform role
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    Moderator,
}

/// Profile social links
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
}

/// Notification and display preferences
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default = "default_true")]
    pub email_notifications: bool,
    #[serde(default)]
    pub newsletter: bool,
    /// One of "light", "dark", "auto"
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            email_notifications: true,
            newsletter: false,
            theme: default_theme(),
        }
    }
}

/// Aggregate counters maintained as side effects of post/comment operations
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub total_views: i64,
    #[serde(default)]
    pub total_likes: i64,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub name: String,

    /// Globally unique, lowercased
    pub email: String,

    /// Globally unique when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Credential hash, written by the external registrar.
    /// Never serialized into API responses.
    #[serde(default, skip_serializing)]
    pub password_hash: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default)]
    pub social_links: SocialLinks,

    #[serde(default)]
    pub role: UserRole,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(default)]
    pub followers: Vec<ObjectId>,

    #[serde(default)]
    pub following: Vec<ObjectId>,

    /// Bookmarked post references; mirrored on the post's bookmarks set
    #[serde(default)]
    pub bookmarks: Vec<ObjectId>,

    #[serde(default)]
    pub preferences: UserPreferences,

    #[serde(default)]
    pub stats: UserStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime>,

    #[serde(default)]
    pub metadata: Metadata,
}

fn default_true() -> bool {
    true
}

fn default_theme() -> String {
    "light".to_string()
}

impl UserDoc {
    /// Create a new user document
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: None,
            name,
            email: email.to_lowercase(),
            username: None,
            password_hash,
            avatar: None,
            bio: None,
            website: None,
            location: None,
            social_links: SocialLinks::default(),
            role: UserRole::User,
            is_verified: false,
            followers: Vec::new(),
            following: Vec::new(),
            bookmarks: Vec::new(),
            preferences: UserPreferences::default(),
            stats: UserStats::default(),
            last_active: Some(DateTime::now()),
            joined_at: Some(DateTime::now()),
            metadata: Metadata::new(),
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Sparse so documents without a username don't collide
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            (doc! { "name": 1 }, None),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_lowercases_email() {
        let user = UserDoc::new("Ada".into(), "Ada@Example.COM".into(), "hash".into());
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, UserRole::User);
        assert!(user.preferences.email_notifications);
        assert_eq!(user.preferences.theme, "light");
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = UserDoc::new("Ada".into(), "ada@example.com".into(), "secret".into());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password"));
    }
}
