//! Comment document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for comments
pub const COMMENT_COLLECTION: &str = "comments";

/// Comment document stored in MongoDB
///
/// Belongs to exactly one post; deletable only by its author.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub post: ObjectId,

    pub author: ObjectId,

    pub content: String,

    #[serde(default)]
    pub metadata: Metadata,
}

impl CommentDoc {
    pub fn new(post: ObjectId, author: ObjectId, content: String) -> Self {
        Self {
            id: None,
            post,
            author,
            content,
            metadata: Metadata::new(),
        }
    }
}

impl IntoIndexes for CommentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (doc! { "post": 1, "metadata.created_at": -1 }, None),
            (doc! { "author": 1 }, None),
        ]
    }
}

impl MutMetadata for CommentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
