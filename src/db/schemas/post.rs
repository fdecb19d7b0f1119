//! Post document schema
//!
//! Blog posts with denormalized engagement counters and the list-query
//! filter/sort builder used by the post service.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for posts
pub const POST_COLLECTION: &str = "posts";

/// Publication status of a post
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

/// Post document stored in MongoDB
///
/// Counters (`views`, `likes_count`, `comments_count`, `shares`) are
/// denormalized; `likes_count` is kept equal to `|likes|` by issuing the
/// set mutation and the counter delta in a single update document.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PostDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Author reference, immutable after creation
    pub author: ObjectId,

    pub title: String,

    /// URL-safe unique identifier, derived from the title and sticky
    /// once assigned
    pub slug: String,

    pub content: String,

    /// Short preview text; derived from content when not supplied
    #[serde(default)]
    pub excerpt: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Estimated reading time in minutes (200 wpm)
    #[serde(default)]
    pub reading_time: u32,

    #[serde(default)]
    pub views: i64,

    #[serde(default)]
    pub likes_count: i64,

    #[serde(default)]
    pub comments_count: i64,

    #[serde(default)]
    pub shares: i64,

    #[serde(default = "default_true")]
    pub is_published: bool,

    #[serde(default)]
    pub is_featured: bool,

    /// Set on the first transition into `published`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime>,

    #[serde(default)]
    pub status: PostStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,

    /// Users who liked this post
    #[serde(default)]
    pub likes: Vec<ObjectId>,

    /// Users who bookmarked this post
    #[serde(default)]
    pub bookmarks: Vec<ObjectId>,

    /// Comment references, in insertion order
    #[serde(default)]
    pub comments: Vec<ObjectId>,

    pub last_modified: DateTime,

    #[serde(default)]
    pub metadata: Metadata,
}

fn default_true() -> bool {
    true
}

impl PostDoc {
    /// Create a new post owned by `author`; derived fields are filled in
    /// by the service layer before insert
    pub fn new(author: ObjectId, title: String, slug: String, content: String) -> Self {
        Self {
            id: None,
            author,
            title,
            slug,
            content,
            excerpt: String::new(),
            cover_image: None,
            categories: Vec::new(),
            tags: Vec::new(),
            reading_time: 0,
            views: 0,
            likes_count: 0,
            comments_count: 0,
            shares: 0,
            is_published: true,
            is_featured: false,
            published_at: None,
            status: PostStatus::Published,
            seo_title: None,
            seo_description: None,
            likes: Vec::new(),
            bookmarks: Vec::new(),
            comments: Vec::new(),
            last_modified: DateTime::now(),
            metadata: Metadata::new(),
        }
    }
}

impl IntoIndexes for PostDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "slug": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("slug_unique".to_string())
                        .build(),
                ),
            ),
            (doc! { "author": 1, "metadata.created_at": -1 }, None),
            (doc! { "status": 1, "isPublished": 1 }, None),
            (doc! { "publishedAt": -1 }, None),
            (doc! { "categories": 1, "isPublished": 1 }, None),
            (doc! { "tags": 1, "isPublished": 1 }, None),
            (doc! { "isFeatured": 1, "isPublished": 1 }, None),
            (doc! { "views": -1 }, None),
            (doc! { "likesCount": -1 }, None),
        ]
    }
}

impl MutMetadata for PostDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Sort key for post listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
    Popular,
    Views,
    Trending,
}

impl PostSort {
    pub fn parse(s: &str) -> Self {
        match s {
            "oldest" => Self::Oldest,
            "popular" => Self::Popular,
            "views" => Self::Views,
            "trending" => Self::Trending,
            _ => Self::Newest,
        }
    }

    /// MongoDB sort document. Trending has no stored sort key (the
    /// popularity score is derived); the service sorts in-process and
    /// uses recency here to bound the candidate scan.
    pub fn to_sort(&self) -> Document {
        match self {
            Self::Newest | Self::Trending => doc! { "publishedAt": -1 },
            Self::Oldest => doc! { "publishedAt": 1 },
            Self::Popular => doc! { "likesCount": -1, "views": -1 },
            Self::Views => doc! { "views": -1 },
        }
    }
}

/// Query parameters for listing published posts
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// Case-insensitive substring match over title/excerpt/content/tags
    pub q: Option<String>,

    /// Category membership ("all" means no filter)
    pub category: Option<String>,

    /// Tag membership
    pub tag: Option<String>,

    /// Only featured posts
    pub featured: bool,

    pub sort: PostSort,

    pub page: u32,

    pub limit: u32,
}

impl PostQuery {
    /// Page number clamped to >= 1
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Page size clamped to [1, 50]
    pub fn limit(&self) -> u32 {
        self.limit.clamp(1, 50)
    }

    /// Convert to a MongoDB filter over published posts
    pub fn to_filter(&self) -> Document {
        let mut filter = doc! { "status": "published", "isPublished": true };

        if let Some(ref q) = self.q {
            let pattern = regex::escape(q);
            let re = doc! { "$regex": &pattern, "$options": "i" };
            filter.insert(
                "$or",
                vec![
                    doc! { "title": re.clone() },
                    doc! { "excerpt": re.clone() },
                    doc! { "content": re.clone() },
                    doc! { "tags": re },
                ],
            );
        }

        if let Some(ref category) = self.category {
            if category != "all" {
                filter.insert("categories", category);
            }
        }

        if let Some(ref tag) = self.tag {
            filter.insert("tags", tag);
        }

        if self.featured {
            filter.insert("isFeatured", true);
        }

        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_requires_published() {
        let filter = PostQuery::default().to_filter();
        assert_eq!(filter.get_str("status").unwrap(), "published");
        assert!(filter.get_bool("isPublished").unwrap());
    }

    #[test]
    fn test_filter_category_all_is_no_filter() {
        let query = PostQuery {
            category: Some("all".into()),
            ..Default::default()
        };
        assert!(!query.to_filter().contains_key("categories"));

        let query = PostQuery {
            category: Some("travel".into()),
            ..Default::default()
        };
        assert_eq!(query.to_filter().get_str("categories").unwrap(), "travel");
    }

    #[test]
    fn test_filter_escapes_regex_metacharacters() {
        let query = PostQuery {
            q: Some("c++ (tips)".into()),
            ..Default::default()
        };
        let filter = query.to_filter();
        let or = filter.get_array("$or").unwrap();
        let title = or[0].as_document().unwrap().get_document("title").unwrap();
        let pattern = title.get_str("$regex").unwrap();
        assert!(pattern.contains(r"\+\+"));
        assert!(pattern.contains(r"\("));
    }

    #[test]
    fn test_sort_mapping() {
        assert_eq!(PostSort::parse("popular"), PostSort::Popular);
        assert_eq!(PostSort::parse("bogus"), PostSort::Newest);
        assert_eq!(
            PostSort::Popular.to_sort(),
            doc! { "likesCount": -1, "views": -1 }
        );
        assert_eq!(PostSort::Oldest.to_sort(), doc! { "publishedAt": 1 });
    }

    #[test]
    fn test_clamps() {
        let query = PostQuery {
            page: 0,
            limit: 500,
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 50);

        let query = PostQuery {
            page: 3,
            limit: 0,
            ..Default::default()
        };
        assert_eq!(query.limit(), 1);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&PostStatus::Draft).unwrap();
        assert_eq!(json, "\"draft\"");
    }
}
