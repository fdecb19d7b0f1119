//! Document lifecycle metadata
//!
//! Every stored document embeds this envelope. Removal is an update for
//! collections that soft-delete (comments), and every read path filters
//! on `is_deleted`.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Lifecycle envelope embedded in every stored document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// Soft-deletion flag; reads treat a set flag as absence
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Fresh metadata stamped with the current time
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(now),
            created_at: Some(now),
        }
    }
}
