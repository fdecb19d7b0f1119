//! Platform statistics
//!
//! Read-only aggregate views over the whole corpus: headline totals plus
//! category and tag leaderboards.

use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Serialize;

use crate::db::schemas::{CommentDoc, PostDoc, UserDoc, COMMENT_COLLECTION, POST_COLLECTION, USER_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::services::doc_i64;
use crate::services::posts::PostStatRow;
use crate::types::{ApiError, Result};

const RECENT_POSTS: i64 = 10;
const TOP_CATEGORIES: i64 = 10;
const TOP_TAGS: i64 = 20;

/// Headline platform totals
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_posts: u64,
    pub total_users: u64,
    pub total_views: i64,
    pub total_comments: u64,
    pub recent_posts: Vec<PostStatRow>,
}

/// One leaderboard row for a category or tag
#[derive(Debug, Serialize)]
pub struct FacetCount {
    pub name: String,
    pub count: i64,
}

/// Aggregate statistics over posts, users, and comments
#[derive(Clone)]
pub struct StatsService {
    mongo: MongoClient,
}

impl StatsService {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    async fn posts(&self) -> Result<MongoCollection<PostDoc>> {
        self.mongo.collection::<PostDoc>(POST_COLLECTION).await
    }

    /// Platform-wide totals and the 10 most recent published posts
    pub async fn platform(&self) -> Result<PlatformStats> {
        let posts = self.posts().await?;
        let users = self.mongo.collection::<UserDoc>(USER_COLLECTION).await?;
        let comments = self
            .mongo
            .collection::<CommentDoc>(COMMENT_COLLECTION)
            .await?;

        let published = doc! { "status": "published", "isPublished": true };

        let (total_posts, total_users, total_comments) = tokio::join!(
            posts.count(published.clone()),
            users.count(doc! {}),
            comments.count(doc! {}),
        );
        let total_posts = total_posts?;
        let total_users = total_users?;
        let total_comments = total_comments?;

        // Views are summed in one $group pass instead of paging documents
        let pipeline = vec![
            doc! { "$match": {
                "status": "published",
                "isPublished": true,
                "metadata.is_deleted": { "$ne": true },
            } },
            doc! { "$group": { "_id": null, "views": { "$sum": "$views" } } },
        ];
        let totals: Vec<Document> = posts
            .inner()
            .aggregate(pipeline)
            .await
            .map_err(|e| ApiError::Database(format!("Aggregation failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::Database(format!("Cursor failed: {}", e)))?;
        let total_views = totals.first().map(|d| doc_i64(d, "views")).unwrap_or(0);

        let options = FindOptions::builder()
            .sort(doc! { "publishedAt": -1 })
            .limit(RECENT_POSTS)
            .build();
        let mut recent_filter = published;
        recent_filter.insert("metadata.is_deleted", doc! { "$ne": true });
        let recent: Vec<PostDoc> = posts
            .inner()
            .find(recent_filter)
            .with_options(options)
            .await
            .map_err(|e| ApiError::Database(format!("Find failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::Database(format!("Cursor failed: {}", e)))?;

        Ok(PlatformStats {
            total_posts,
            total_users,
            total_views,
            total_comments,
            recent_posts: recent.iter().map(PostStatRow::from_post).collect(),
        })
    }

    /// Top 10 categories by published post count
    pub async fn categories(&self) -> Result<Vec<FacetCount>> {
        self.facet_counts("categories", TOP_CATEGORIES).await
    }

    /// Top 20 tags by published post count
    pub async fn tags(&self) -> Result<Vec<FacetCount>> {
        self.facet_counts("tags", TOP_TAGS).await
    }

    async fn facet_counts(&self, field: &str, limit: i64) -> Result<Vec<FacetCount>> {
        let path = format!("${}", field);
        let pipeline = vec![
            doc! { "$match": {
                "status": "published",
                "isPublished": true,
                "metadata.is_deleted": { "$ne": true },
            } },
            doc! { "$unwind": &path },
            doc! { "$group": { "_id": &path, "count": { "$sum": 1 } } },
            doc! { "$sort": { "count": -1, "_id": 1 } },
            doc! { "$limit": limit },
        ];

        let rows: Vec<Document> = self
            .posts()
            .await?
            .inner()
            .aggregate(pipeline)
            .await
            .map_err(|e| ApiError::Database(format!("Aggregation failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::Database(format!("Cursor failed: {}", e)))?;

        Ok(rows
            .iter()
            .filter_map(|d| {
                let name = d.get_str("_id").ok()?.to_string();
                Some(FacetCount {
                    name,
                    count: doc_i64(d, "count"),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_i64_widths() {
        let d = doc! { "a": 5_i32, "b": 5_000_000_000_i64, "c": 1.5 };
        assert_eq!(doc_i64(&d, "a"), 5);
        assert_eq!(doc_i64(&d, "b"), 5_000_000_000);
        assert_eq!(doc_i64(&d, "c"), 1);
        assert_eq!(doc_i64(&d, "missing"), 0);
    }
}
