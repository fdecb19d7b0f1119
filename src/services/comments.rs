//! Comment service
//!
//! Flat comments on posts. Every comment write carries the paired post
//! update (the `comments` array and the `commentsCount` counter) so the
//! denormalized counter tracks the real comment count, including after
//! deletions.

use bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};

use crate::db::schemas::{CommentDoc, PostDoc, COMMENT_COLLECTION, POST_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::services::{load_authors, page_count, parse_object_id, AuthorSummary};
use crate::types::{ApiError, Result};

/// Body of a comment creation request
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// Comment as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub post: String,
    pub content: String,
    pub author: AuthorSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl CommentView {
    fn build(comment: &CommentDoc, author: AuthorSummary) -> Self {
        Self {
            id: comment.id.map(|o| o.to_hex()).unwrap_or_default(),
            post: comment.post.to_hex(),
            content: comment.content.clone(),
            author,
            created_at: comment.metadata.created_at,
        }
    }
}

/// Paginated comment listing for one post
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListResponse {
    pub comments: Vec<CommentView>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
}

/// Comment operations for posts
#[derive(Clone)]
pub struct CommentService {
    mongo: MongoClient,
}

impl CommentService {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    async fn comments(&self) -> Result<MongoCollection<CommentDoc>> {
        self.mongo
            .collection::<CommentDoc>(COMMENT_COLLECTION)
            .await
    }

    async fn posts(&self) -> Result<MongoCollection<PostDoc>> {
        self.mongo.collection::<PostDoc>(POST_COLLECTION).await
    }

    /// List comments on a post, newest first
    pub async fn list(&self, post_id: &str, page: u32, limit: u32) -> Result<CommentListResponse> {
        use futures_util::TryStreamExt;

        let oid = parse_object_id(post_id, "post")?;
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let comments = self.comments().await?;
        let filter = doc! { "post": oid, "metadata.is_deleted": { "$ne": true } };

        let options = FindOptions::builder()
            .sort(doc! { "metadata.created_at": -1 })
            .skip(((page - 1) * limit) as u64)
            .limit(limit as i64)
            .build();

        let cursor = comments
            .inner()
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| ApiError::Database(format!("Find failed: {}", e)))?;
        let rows: Vec<CommentDoc> = cursor
            .try_collect()
            .await
            .map_err(|e| ApiError::Database(format!("Cursor failed: {}", e)))?;

        let total = comments.count(doc! { "post": oid }).await?;

        let author_ids: Vec<ObjectId> = rows.iter().map(|c| c.author).collect();
        let authors = load_authors(&self.mongo, &author_ids).await?;

        let views = rows
            .iter()
            .map(|c| {
                let author = authors
                    .get(&c.author)
                    .cloned()
                    .unwrap_or_else(|| AuthorSummary::unknown(c.author));
                CommentView::build(c, author)
            })
            .collect();

        Ok(CommentListResponse {
            comments: views,
            total,
            pages: page_count(total, limit),
            current_page: page,
        })
    }

    /// Add a comment and its paired post update
    pub async fn create(
        &self,
        post_id: &str,
        author: ObjectId,
        req: CreateCommentRequest,
    ) -> Result<CommentView> {
        let oid = parse_object_id(post_id, "post")?;
        if req.content.trim().is_empty() {
            return Err(ApiError::BadRequest("Content is required".to_string()));
        }

        let posts = self.posts().await?;
        if posts.find_one(doc! { "_id": oid }).await?.is_none() {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }

        let comments = self.comments().await?;
        let mut comment = CommentDoc::new(oid, author, req.content);
        let comment_id = comments.insert_one(comment.clone()).await?;
        comment.id = Some(comment_id);
        comment.metadata.created_at = Some(DateTime::now());

        posts
            .update_one(
                doc! { "_id": oid },
                doc! {
                    "$push": { "comments": comment_id },
                    "$inc": { "commentsCount": 1 },
                },
            )
            .await?;

        let authors = load_authors(&self.mongo, &[author]).await?;
        let author_summary = authors
            .get(&author)
            .cloned()
            .unwrap_or_else(|| AuthorSummary::unknown(author));

        Ok(CommentView::build(&comment, author_summary))
    }

    /// Soft-delete a comment; only its author may do so. The post's
    /// comment array and counter are restored alongside.
    pub async fn delete(&self, comment_id: &str, caller: ObjectId) -> Result<()> {
        let oid = parse_object_id(comment_id, "comment")?;
        let comments = self.comments().await?;

        let comment = comments
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;
        if comment.author != caller {
            return Err(ApiError::Forbidden("Not the comment author".to_string()));
        }

        comments.soft_delete(doc! { "_id": oid }).await?;

        self.posts()
            .await?
            .update_one(
                doc! { "_id": comment.post },
                doc! {
                    "$pull": { "comments": oid },
                    "$inc": { "commentsCount": -1 },
                },
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_view_carries_created_at() {
        let mut comment = CommentDoc::new(ObjectId::new(), ObjectId::new(), "hi".into());
        comment.id = Some(ObjectId::new());
        comment.metadata.created_at = Some(DateTime::now());

        let view = CommentView::build(&comment, AuthorSummary::unknown(comment.author));
        assert_eq!(view.content, "hi");
        assert!(view.created_at.is_some());
        assert_eq!(view.post, comment.post.to_hex());
    }

    #[test]
    fn test_empty_content_rejected_shape() {
        let req: CreateCommentRequest = serde_json::from_str(r#"{"content":"  "}"#).unwrap();
        assert!(req.content.trim().is_empty());
    }
}
