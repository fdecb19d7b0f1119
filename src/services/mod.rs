//! Service layer
//!
//! One service per entity. Each owns the store operations for its
//! operations and translates every failure into the `ApiError` taxonomy;
//! handlers never see raw driver errors.

pub mod comments;
pub mod posts;
pub mod search;
pub mod stats;

pub use comments::CommentService;
pub use posts::PostService;
pub use search::SearchService;
pub use stats::StatsService;

use bson::{doc, oid::ObjectId};
use serde::Serialize;
use std::collections::HashMap;

use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::db::MongoClient;
use crate::types::{ApiError, Result};

/// Trimmed author view embedded in post and comment responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl AuthorSummary {
    pub fn from_user(user: &UserDoc) -> Self {
        Self {
            id: user.id.map(|o| o.to_hex()).unwrap_or_default(),
            name: user.name.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
        }
    }

    /// Placeholder for a missing author document (deleted account)
    pub fn unknown(id: ObjectId) -> Self {
        Self {
            id: id.to_hex(),
            name: "Unknown".to_string(),
            username: None,
            avatar: None,
            bio: None,
        }
    }
}

/// Batch-load author summaries for a set of user references
pub async fn load_authors(
    mongo: &MongoClient,
    ids: &[ObjectId],
) -> Result<HashMap<ObjectId, AuthorSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
    let docs = users.find_many(doc! { "_id": { "$in": ids } }).await?;

    Ok(docs
        .iter()
        .filter_map(|u| u.id.map(|oid| (oid, AuthorSummary::from_user(u))))
        .collect())
}

/// Parse a hex ObjectId from a path segment
pub fn parse_object_id(id: &str, what: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| ApiError::BadRequest(format!("Invalid {} ID", what)))
}

/// Total page count for a result set
pub fn page_count(total: u64, limit: u32) -> u64 {
    let limit = limit.max(1) as u64;
    total.div_ceil(limit)
}

/// Read a numeric aggregation result; MongoDB returns Int32, Int64, or
/// Double depending on magnitude and operand types
pub(crate) fn doc_i64(d: &bson::Document, key: &str) -> i64 {
    match d.get(key) {
        Some(bson::Bson::Int64(v)) => *v,
        Some(bson::Bson::Int32(v)) => *v as i64,
        Some(bson::Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
    }

    #[test]
    fn test_parse_object_id() {
        assert!(parse_object_id("65f000000000000000000001", "post").is_ok());
        let err = parse_object_id("not-an-oid", "post").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
