//! Search service
//!
//! Substring search over posts and users, plus typeahead suggestions.
//! Queries are regex-escaped before they reach MongoDB so user input can
//! never change the match semantics.

use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Serialize;

use crate::db::schemas::{PostDoc, UserDoc, POST_COLLECTION, USER_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::services::posts::PostSummary;
use crate::services::{load_authors, page_count, AuthorSummary};
use crate::types::{ApiError, Result};

/// Minimum query length; shorter queries are rejected for search and
/// answered with an empty list for suggestions
const MIN_QUERY_LEN: usize = 2;

const TITLE_SUGGESTIONS: i64 = 5;
const CATEGORY_SUGGESTIONS: i64 = 3;
const TAG_SUGGESTIONS: i64 = 3;
const MAX_SUGGESTIONS: usize = 8;

/// Which collections to search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    #[default]
    All,
    Posts,
    Users,
}

impl SearchType {
    pub fn parse(s: &str) -> Self {
        match s {
            "posts" => Self::Posts,
            "users" => Self::Users,
            _ => Self::All,
        }
    }
}

/// One paginated result block
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBlock<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
}

/// Combined search response; blocks absent for types not searched
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<SearchBlock<PostSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<SearchBlock<AuthorSummary>>,
}

/// Typeahead suggestion entry
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Typeahead response envelope
#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

/// Search over posts and users
#[derive(Clone)]
pub struct SearchService {
    mongo: MongoClient,
}

impl SearchService {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    async fn posts(&self) -> Result<MongoCollection<PostDoc>> {
        self.mongo.collection::<PostDoc>(POST_COLLECTION).await
    }

    async fn users(&self) -> Result<MongoCollection<UserDoc>> {
        self.mongo.collection::<UserDoc>(USER_COLLECTION).await
    }

    /// Run a search; queries under 2 characters are rejected
    pub async fn search(
        &self,
        raw_query: &str,
        search_type: SearchType,
        page: u32,
        limit: u32,
    ) -> Result<SearchResponse> {
        let query = validate_query(raw_query)?;
        let (page, limit) = clamp_paging(page, limit);
        let pattern = regex::escape(query);

        let posts = match search_type {
            SearchType::All | SearchType::Posts => {
                Some(self.search_posts(&pattern, page, limit).await?)
            }
            SearchType::Users => None,
        };
        let users = match search_type {
            SearchType::All | SearchType::Users => {
                Some(self.search_users(&pattern, page, limit).await?)
            }
            SearchType::Posts => None,
        };

        Ok(SearchResponse {
            query: query.to_string(),
            posts,
            users,
        })
    }

    async fn search_posts(
        &self,
        pattern: &str,
        page: u32,
        limit: u32,
    ) -> Result<SearchBlock<PostSummary>> {
        let re = doc! { "$regex": pattern, "$options": "i" };
        let filter = doc! {
            "status": "published",
            "isPublished": true,
            "metadata.is_deleted": { "$ne": true },
            "$or": [
                { "title": re.clone() },
                { "excerpt": re.clone() },
                { "content": re.clone() },
                { "categories": re.clone() },
                { "tags": re },
            ],
        };

        let collection = self.posts().await?;
        let options = FindOptions::builder()
            .sort(doc! { "views": -1, "likesCount": -1 })
            .skip(((page - 1) * limit) as u64)
            .limit(limit as i64)
            .build();

        let rows: Vec<PostDoc> = collection
            .inner()
            .find(filter.clone())
            .with_options(options)
            .await
            .map_err(|e| ApiError::Database(format!("Find failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::Database(format!("Cursor failed: {}", e)))?;

        let total = collection.count(filter).await?;

        let author_ids: Vec<_> = rows.iter().map(|p| p.author).collect();
        let authors = load_authors(&self.mongo, &author_ids).await?;
        let data = rows
            .iter()
            .map(|p| {
                let author = authors
                    .get(&p.author)
                    .cloned()
                    .unwrap_or_else(|| AuthorSummary::unknown(p.author));
                PostSummary::build(p, author)
            })
            .collect();

        Ok(SearchBlock {
            data,
            total,
            pages: page_count(total, limit),
            current_page: page,
        })
    }

    async fn search_users(
        &self,
        pattern: &str,
        page: u32,
        limit: u32,
    ) -> Result<SearchBlock<AuthorSummary>> {
        let re = doc! { "$regex": pattern, "$options": "i" };
        let filter = doc! {
            "metadata.is_deleted": { "$ne": true },
            "$or": [
                { "name": re.clone() },
                { "username": re.clone() },
                { "bio": re },
            ],
        };

        let collection = self.users().await?;
        let options = FindOptions::builder()
            .sort(doc! { "stats.followersCount": -1 })
            .skip(((page - 1) * limit) as u64)
            .limit(limit as i64)
            .build();

        let rows: Vec<UserDoc> = collection
            .inner()
            .find(filter.clone())
            .with_options(options)
            .await
            .map_err(|e| ApiError::Database(format!("Find failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::Database(format!("Cursor failed: {}", e)))?;

        let total = collection.count(filter).await?;

        Ok(SearchBlock {
            data: rows.iter().map(AuthorSummary::from_user).collect(),
            total,
            pages: page_count(total, limit),
            current_page: page,
        })
    }

    /// Typeahead suggestions: up to 5 matching titles, 3 categories, and
    /// 3 tags, capped at 8 entries. Short queries get an empty list, not
    /// an error.
    pub async fn suggestions(&self, raw_query: &str) -> Result<SuggestionsResponse> {
        let query = raw_query.trim();
        if query.len() < MIN_QUERY_LEN {
            return Ok(SuggestionsResponse {
                suggestions: Vec::new(),
            });
        }

        let pattern = regex::escape(query);
        let re = doc! { "$regex": &pattern, "$options": "i" };
        let collection = self.posts().await?;

        let options = FindOptions::builder()
            .sort(doc! { "views": -1 })
            .limit(TITLE_SUGGESTIONS)
            .build();
        let title_rows: Vec<PostDoc> = collection
            .inner()
            .find(doc! {
                "status": "published",
                "isPublished": true,
                "metadata.is_deleted": { "$ne": true },
                "title": re.clone(),
            })
            .with_options(options)
            .await
            .map_err(|e| ApiError::Database(format!("Find failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::Database(format!("Cursor failed: {}", e)))?;

        let categories = self
            .facet_suggestions(&pattern, "categories", CATEGORY_SUGGESTIONS)
            .await?;
        let tags = self
            .facet_suggestions(&pattern, "tags", TAG_SUGGESTIONS)
            .await?;

        let mut suggestions: Vec<Suggestion> = title_rows
            .into_iter()
            .map(|p| Suggestion {
                kind: "post",
                text: p.title,
            })
            .collect();
        suggestions.extend(categories.into_iter().map(|text| Suggestion {
            kind: "category",
            text,
        }));
        suggestions.extend(tags.into_iter().map(|text| Suggestion { kind: "tag", text }));
        suggestions.truncate(MAX_SUGGESTIONS);

        Ok(SuggestionsResponse { suggestions })
    }

    /// Most frequent values of an array field that match the pattern
    async fn facet_suggestions(
        &self,
        pattern: &str,
        field: &str,
        limit: i64,
    ) -> Result<Vec<String>> {
        let path = format!("${}", field);
        let pipeline = vec![
            doc! { "$match": {
                "status": "published",
                "isPublished": true,
                "metadata.is_deleted": { "$ne": true },
            } },
            doc! { "$unwind": &path },
            doc! { "$match": { field: { "$regex": pattern, "$options": "i" } } },
            doc! { "$group": { "_id": &path, "count": { "$sum": 1 } } },
            doc! { "$sort": { "count": -1 } },
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
            .filter_map(|d| d.get_str("_id").ok().map(str::to_string))
            .collect())
    }
}

/// Trim a raw query and enforce the minimum length
fn validate_query(raw: &str) -> Result<&str> {
    let query = raw.trim();
    if query.len() < MIN_QUERY_LEN {
        return Err(ApiError::BadRequest(
            "Search query must be at least 2 characters".to_string(),
        ));
    }
    Ok(query)
}

/// Page floor and limit clamp shared by both search branches
fn clamp_paging(page: u32, limit: u32) -> (u32, u32) {
    (page.max(1), limit.clamp(1, 50))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_type_parsing() {
        assert_eq!(SearchType::parse("posts"), SearchType::Posts);
        assert_eq!(SearchType::parse("users"), SearchType::Users);
        assert_eq!(SearchType::parse("all"), SearchType::All);
        assert_eq!(SearchType::parse("garbage"), SearchType::All);
    }

    #[test]
    fn test_suggestion_serializes_type_field() {
        let s = Suggestion {
            kind: "category",
            text: "rust".into(),
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["type"], "category");
        assert_eq!(json["text"], "rust");
    }

    #[test]
    fn test_suggestions_wrapped_in_envelope() {
        let resp = SuggestionsResponse {
            suggestions: vec![Suggestion {
                kind: "post",
                text: "Async Rust".into(),
            }],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["suggestions"][0]["text"], "Async Rust");
    }

    #[test]
    fn test_short_queries_rejected() {
        assert!(matches!(validate_query(""), Err(ApiError::BadRequest(_))));
        assert!(matches!(validate_query("a"), Err(ApiError::BadRequest(_))));
        // Whitespace does not count toward the minimum
        assert!(matches!(validate_query("  a  "), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_query_trimmed_and_accepted_at_minimum_length() {
        assert_eq!(validate_query("ab").unwrap(), "ab");
        assert_eq!(validate_query("  rust  ").unwrap(), "rust");
    }

    #[test]
    fn test_paging_clamps() {
        assert_eq!(clamp_paging(0, 0), (1, 1));
        assert_eq!(clamp_paging(3, 500), (3, 50));
        assert_eq!(clamp_paging(2, 20), (2, 20));
    }
}
