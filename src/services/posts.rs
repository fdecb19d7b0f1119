//! Post service
//!
//! CRUD + engagement operations (like, bookmark, share, views) and the
//! listing/filtering/sorting/pagination logic over published posts.
//!
//! Counter invariant: every set mutation (likes, bookmarks) carries its
//! counter delta in the same update document, guarded by a membership
//! test in the filter, so two concurrent toggles cannot leave the counter
//! out of step with the set.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::schemas::{
    PostDoc, PostQuery, PostSort, PostStatus, UserDoc, POST_COLLECTION, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::domain;
use crate::services::{doc_i64, load_authors, page_count, parse_object_id, AuthorSummary};
use crate::types::{ApiError, Result};

/// Candidate cap when sorting by the derived popularity score in-process
const TRENDING_SCAN_LIMIT: i64 = 500;

/// Trending window in days
const TRENDING_WINDOW_DAYS: i64 = 7;

// ============================================================================
// Request / response types
// ============================================================================

/// Fields a caller may set at creation time
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
}

/// Mutable fields for updates. Author, id, and slug are deliberately not
/// representable here; unknown JSON fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub is_featured: Option<bool>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
}

/// Post row in list responses
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub views: i64,
    pub reading_time: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime>,
    pub is_featured: bool,
    pub author: AuthorSummary,
}

impl PostSummary {
    pub(crate) fn build(post: &PostDoc, author: AuthorSummary) -> Self {
        Self {
            id: post.id.map(|o| o.to_hex()).unwrap_or_default(),
            title: post.title.clone(),
            slug: post.slug.clone(),
            excerpt: post.excerpt.clone(),
            cover_image: post.cover_image.clone(),
            categories: post.categories.clone(),
            tags: post.tags.clone(),
            likes_count: post.likes_count,
            comments_count: post.comments_count,
            views: post.views,
            reading_time: post.reading_time,
            published_at: post.published_at,
            is_featured: post.is_featured,
            author,
        }
    }
}

/// Full post view with derived scores and related posts
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostSummary,
    pub content: String,
    pub shares: i64,
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    pub last_modified: DateTime,
    /// Computed at read time, never stored
    pub engagement_score: f64,
    /// Computed at read time, never stored
    pub popularity_score: f64,
    pub related_posts: Vec<PostSummary>,
}

/// Paginated post listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListResponse {
    pub posts: Vec<PostSummary>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
    pub has_more: bool,
}

/// Result of a like toggle
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResult {
    pub likes_count: i64,
    pub is_liked: bool,
}

/// Result of a bookmark toggle
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkResult {
    pub is_bookmarked: bool,
}

/// Unpaginated post collection (trending, featured)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFeed {
    pub posts: Vec<PostSummary>,
}

/// Title/views/likes row for analytics and stats
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostStatRow {
    pub title: String,
    pub views: i64,
    pub likes_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime>,
}

impl PostStatRow {
    pub(crate) fn from_post(post: &PostDoc) -> Self {
        Self {
            title: post.title.clone(),
            views: post.views,
            likes_count: post.likes_count,
            published_at: post.published_at,
        }
    }
}

/// Author-scoped totals
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub total_posts: u64,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub recent_views: Vec<PostStatRow>,
}

// ============================================================================
// Service
// ============================================================================

/// Post CRUD and engagement operations
#[derive(Clone)]
pub struct PostService {
    mongo: MongoClient,
}

impl PostService {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    async fn posts(&self) -> Result<MongoCollection<PostDoc>> {
        self.mongo.collection::<PostDoc>(POST_COLLECTION).await
    }

    async fn users(&self) -> Result<MongoCollection<UserDoc>> {
        self.mongo.collection::<UserDoc>(USER_COLLECTION).await
    }

    /// Fetch a sorted page of posts, soft-delete aware
    async fn find_page(
        &self,
        filter: Document,
        sort: Document,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<PostDoc>> {
        use futures_util::TryStreamExt;

        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let options = FindOptions::builder()
            .sort(sort)
            .skip(skip)
            .limit(limit)
            .build();

        let cursor = self
            .posts()
            .await?
            .inner()
            .find(full_filter)
            .with_options(options)
            .await
            .map_err(|e| ApiError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| ApiError::Database(format!("Cursor failed: {}", e)))
    }

    /// Attach author summaries to a set of posts
    async fn summarize(&self, posts: &[PostDoc]) -> Result<Vec<PostSummary>> {
        let author_ids: Vec<ObjectId> = posts.iter().map(|p| p.author).collect();
        let authors = load_authors(&self.mongo, &author_ids).await?;

        Ok(posts
            .iter()
            .map(|p| {
                let author = authors
                    .get(&p.author)
                    .cloned()
                    .unwrap_or_else(|| AuthorSummary::unknown(p.author));
                PostSummary::build(p, author)
            })
            .collect())
    }

    /// List published posts with filtering, sorting, and pagination
    pub async fn list(&self, query: &PostQuery) -> Result<PostListResponse> {
        let filter = query.to_filter();
        let page = query.page();
        let limit = query.limit();
        let skip = ((page - 1) * limit) as u64;

        let posts = if query.sort == PostSort::Trending {
            // Popularity score is derived, so sort in-process over a
            // bounded, newest-first candidate set
            let candidates = self
                .find_page(filter.clone(), query.sort.to_sort(), 0, TRENDING_SCAN_LIMIT)
                .await?;
            let mut scored = score_posts(candidates);
            sort_by_popularity(&mut scored);
            scored
                .into_iter()
                .map(|(p, _)| p)
                .skip(skip as usize)
                .take(limit as usize)
                .collect()
        } else {
            self.find_page(filter.clone(), query.sort.to_sort(), skip, limit as i64)
                .await?
        };

        let (summaries, total) = tokio::join!(
            self.summarize(&posts),
            async { self.posts().await?.count(filter).await },
        );
        let summaries = summaries?;
        let total = total?;

        let pages = page_count(total, limit);
        Ok(PostListResponse {
            posts: summaries,
            total,
            pages,
            current_page: page,
            has_more: (page as u64) < pages,
        })
    }

    /// Fetch one published post by ObjectId or slug.
    ///
    /// Side effects: atomically increments the view counter by one on every
    /// successful fetch (no deduplication), and gathers up to 3 related
    /// published posts sharing a category.
    pub async fn get(&self, id_or_slug: &str) -> Result<PostDetail> {
        let posts = self.posts().await?;

        let mut filter = match ObjectId::parse_str(id_or_slug) {
            Ok(oid) => doc! { "_id": oid },
            Err(_) => doc! { "slug": id_or_slug },
        };
        filter.insert("status", "published");
        filter.insert("isPublished", true);

        let post = posts
            .find_one(filter)
            .await?
            .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
        let post_id = post
            .id
            .ok_or_else(|| ApiError::Internal("Post missing _id".to_string()))?;

        // Unconditional atomic increment; repeated fetches each count
        posts
            .update_one(doc! { "_id": post_id }, doc! { "$inc": { "views": 1 } })
            .await?;

        let related = if post.categories.is_empty() {
            Vec::new()
        } else {
            self.find_page(
                doc! {
                    "_id": { "$ne": post_id },
                    "categories": { "$in": post.categories.clone() },
                    "status": "published",
                    "isPublished": true,
                },
                doc! { "publishedAt": -1 },
                0,
                3,
            )
            .await?
        };

        let related_posts = self.summarize(&related).await?;
        let mut summaries = self.summarize(std::slice::from_ref(&post)).await?;
        let mut summary = summaries.remove(0);
        // Reflect the increment this fetch just made
        summary.views += 1;

        let now_ms = DateTime::now().timestamp_millis();
        let published_ms = post.published_at.map(|d| d.timestamp_millis()).unwrap_or(now_ms);
        let engagement =
            domain::engagement_score(post.likes_count, post.comments_count, summary.views);
        let popularity = domain::popularity_score(
            post.likes_count,
            post.comments_count,
            summary.views,
            published_ms,
            now_ms,
        );

        Ok(PostDetail {
            post: summary,
            content: post.content.clone(),
            shares: post.shares,
            status: post.status,
            seo_title: post.seo_title.clone(),
            seo_description: post.seo_description.clone(),
            last_modified: post.last_modified,
            engagement_score: engagement,
            popularity_score: popularity,
            related_posts,
        })
    }

    /// Create a post for the authenticated author
    pub async fn create(&self, author: ObjectId, req: CreatePostRequest) -> Result<PostDetail> {
        if req.title.trim().is_empty() {
            return Err(ApiError::BadRequest("Title is required".to_string()));
        }
        if req.content.trim().is_empty() {
            return Err(ApiError::BadRequest("Content is required".to_string()));
        }

        let slug = match req.slug {
            Some(s) if !s.trim().is_empty() => s,
            _ => domain::slugify(&req.title),
        };
        if slug.is_empty() {
            return Err(ApiError::BadRequest(
                "Title must contain at least one alphanumeric character".to_string(),
            ));
        }

        let mut post = PostDoc::new(author, req.title, slug, req.content);
        post.excerpt = match req.excerpt {
            Some(e) if !e.trim().is_empty() => e,
            _ => domain::excerpt(&post.content),
        };
        post.reading_time = domain::reading_time(&post.content);
        post.cover_image = req.cover_image;
        post.categories = req.categories;
        post.tags = req.tags;
        post.status = req.status.unwrap_or(PostStatus::Published);
        post.is_published = post.status == PostStatus::Published;
        post.is_featured = req.is_featured.unwrap_or(false);
        post.seo_title = req.seo_title;
        post.seo_description = req.seo_description;
        if post.status == PostStatus::Published {
            post.published_at = Some(DateTime::now());
        }

        let posts = self.posts().await?;
        let inserted_id = posts.insert_one(post.clone()).await?;
        post.id = Some(inserted_id);

        // Paired write: bump the author's post counter. Non-transactional,
        // the insert stands even if this fails.
        if let Err(e) = self
            .users()
            .await?
            .update_one(
                doc! { "_id": author },
                doc! { "$inc": { "stats.postsCount": 1 } },
            )
            .await
        {
            warn!("Failed to bump author post count: {}", e);
        }

        self.detail_without_related(post).await
    }

    /// Update a post; only its author may do so
    pub async fn update(
        &self,
        post_id: &str,
        caller: ObjectId,
        req: UpdatePostRequest,
    ) -> Result<PostDetail> {
        let oid = parse_object_id(post_id, "post")?;
        let posts = self.posts().await?;

        let post = posts
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
        if post.author != caller {
            return Err(ApiError::Forbidden("Not the post author".to_string()));
        }

        let mut set = doc! { "lastModified": DateTime::now() };

        if let Some(ref title) = req.title {
            if title.trim().is_empty() {
                return Err(ApiError::BadRequest("Title cannot be empty".to_string()));
            }
            set.insert("title", title.as_str());
            // Slug is sticky: derived once at creation, never re-derived here
        }

        if let Some(ref content) = req.content {
            if content.trim().is_empty() {
                return Err(ApiError::BadRequest("Content cannot be empty".to_string()));
            }
            set.insert("content", content.as_str());
            set.insert("readingTime", domain::reading_time(content) as i64);
            // Excerpt only auto-derives when none was ever set
            if req.excerpt.is_none() && post.excerpt.is_empty() {
                set.insert("excerpt", domain::excerpt(content));
            }
        }

        if let Some(ref excerpt) = req.excerpt {
            set.insert("excerpt", excerpt.as_str());
        }
        if let Some(ref cover) = req.cover_image {
            set.insert("coverImage", cover.as_str());
        }
        if let Some(ref categories) = req.categories {
            set.insert("categories", categories.clone());
        }
        if let Some(ref tags) = req.tags {
            set.insert("tags", tags.clone());
        }
        if let Some(featured) = req.is_featured {
            set.insert("isFeatured", featured);
        }
        if let Some(ref seo_title) = req.seo_title {
            set.insert("seoTitle", seo_title.as_str());
        }
        if let Some(ref seo_description) = req.seo_description {
            set.insert("seoDescription", seo_description.as_str());
        }

        if let Some(status) = req.status {
            set.insert("status", status.as_str());
            set.insert("isPublished", status == PostStatus::Published);
            // publishedAt is stamped on the first transition into published
            if status == PostStatus::Published && post.status != PostStatus::Published {
                set.insert("publishedAt", DateTime::now());
            }
        }

        posts
            .update_one(doc! { "_id": oid }, doc! { "$set": set })
            .await?;

        let updated = posts
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
        self.detail_without_related(updated).await
    }

    /// Hard-delete a post; only its author may do so
    pub async fn delete(&self, post_id: &str, caller: ObjectId) -> Result<()> {
        let oid = parse_object_id(post_id, "post")?;
        let posts = self.posts().await?;

        let post = posts
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
        if post.author != caller {
            return Err(ApiError::Forbidden("Not the post author".to_string()));
        }

        posts.delete_one(doc! { "_id": oid }).await?;
        Ok(())
    }

    /// Toggle a like. The membership test lives in the update filter, so
    /// the set mutation and counter delta land in one atomic operation.
    pub async fn like(&self, post_id: &str, user: ObjectId) -> Result<LikeResult> {
        let oid = parse_object_id(post_id, "post")?;
        let posts = self.posts().await?;

        // Add-if-absent with counter in the same update
        let added = posts
            .update_one(
                doc! { "_id": oid, "likes": { "$ne": user } },
                doc! { "$addToSet": { "likes": user }, "$inc": { "likesCount": 1 } },
            )
            .await?;

        let is_liked = if added.matched_count == 1 {
            true
        } else {
            // Remove-if-present, same guarantee
            let removed = posts
                .update_one(
                    doc! { "_id": oid, "likes": user },
                    doc! { "$pull": { "likes": user }, "$inc": { "likesCount": -1 } },
                )
                .await?;
            if removed.matched_count == 0 {
                return Err(ApiError::NotFound("Post not found".to_string()));
            }
            false
        };

        let post = posts
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

        Ok(LikeResult {
            likes_count: post.likes_count,
            is_liked,
        })
    }

    /// Toggle a bookmark on both the user's and the post's bookmark set.
    /// The user document is the source of truth for the membership test;
    /// each side is an atomic guarded update, but the pair is not
    /// transactional.
    pub async fn bookmark(&self, post_id: &str, user: ObjectId) -> Result<BookmarkResult> {
        let oid = parse_object_id(post_id, "post")?;
        let posts = self.posts().await?;
        let users = self.users().await?;

        if posts.find_one(doc! { "_id": oid }).await?.is_none() {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }

        let added = users
            .update_one(
                doc! { "_id": user, "bookmarks": { "$ne": oid } },
                doc! { "$addToSet": { "bookmarks": oid } },
            )
            .await?;

        let is_bookmarked = if added.matched_count == 1 {
            posts
                .update_one(
                    doc! { "_id": oid },
                    doc! { "$addToSet": { "bookmarks": user } },
                )
                .await?;
            true
        } else {
            let removed = users
                .update_one(
                    doc! { "_id": user, "bookmarks": oid },
                    doc! { "$pull": { "bookmarks": oid } },
                )
                .await?;
            if removed.matched_count == 0 {
                return Err(ApiError::NotFound("User not found".to_string()));
            }
            posts
                .update_one(doc! { "_id": oid }, doc! { "$pull": { "bookmarks": user } })
                .await?;
            false
        };

        Ok(BookmarkResult { is_bookmarked })
    }

    /// Unconditionally bump the share counter; no auth required
    pub async fn share(&self, post_id: &str) -> Result<()> {
        let oid = parse_object_id(post_id, "post")?;
        let result = self
            .posts()
            .await?
            .update_one(doc! { "_id": oid }, doc! { "$inc": { "shares": 1 } })
            .await?;
        if result.matched_count == 0 {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }
        Ok(())
    }

    /// Published posts from the last 7 days, by popularity score desc,
    /// then likes, then views
    pub async fn trending(&self, limit: u32) -> Result<PostFeed> {
        let limit = limit.clamp(1, 50);

        let candidates = self
            .find_page(
                trending_filter(DateTime::now().timestamp_millis()),
                doc! { "publishedAt": -1 },
                0,
                TRENDING_SCAN_LIMIT,
            )
            .await?;

        let mut scored = score_posts(candidates);
        sort_by_popularity(&mut scored);
        let top: Vec<PostDoc> = scored
            .into_iter()
            .map(|(p, _)| p)
            .take(limit as usize)
            .collect();

        Ok(PostFeed {
            posts: self.summarize(&top).await?,
        })
    }

    /// Published + featured posts, newest first
    pub async fn featured(&self, limit: u32) -> Result<PostFeed> {
        let limit = limit.clamp(1, 20);
        let posts = self
            .find_page(
                doc! { "status": "published", "isPublished": true, "isFeatured": true },
                doc! { "publishedAt": -1 },
                0,
                limit as i64,
            )
            .await?;
        Ok(PostFeed {
            posts: self.summarize(&posts).await?,
        })
    }

    /// The caller's own posts, any status, newest first
    pub async fn my_posts(&self, author: ObjectId, page: u32, limit: u32) -> Result<PostListResponse> {
        let page = page.max(1);
        let limit = limit.clamp(1, 50);
        let filter = doc! { "author": author };

        let (posts, total) = tokio::join!(
            self.find_page(
                filter.clone(),
                doc! { "metadata.created_at": -1 },
                ((page - 1) * limit) as u64,
                limit as i64,
            ),
            async { self.posts().await?.count(filter).await },
        );
        let posts = posts?;
        let total = total?;

        let pages = page_count(total, limit);
        Ok(PostListResponse {
            posts: self.summarize(&posts).await?,
            total,
            pages,
            current_page: page,
            has_more: (page as u64) < pages,
        })
    }

    /// Author-scoped totals and the 30 most recent posts
    pub async fn analytics(&self, author: ObjectId) -> Result<AnalyticsResponse> {
        use futures_util::TryStreamExt;

        let posts = self.posts().await?;

        let total_posts = posts
            .count(doc! { "author": author, "status": "published" })
            .await?;

        // Single $group pass over the author's posts for the summed counters
        let pipeline = vec![
            doc! { "$match": { "author": author } },
            doc! { "$group": {
                "_id": null,
                "views": { "$sum": "$views" },
                "likes": { "$sum": "$likesCount" },
                "comments": { "$sum": "$commentsCount" },
            } },
        ];
        let totals: Vec<Document> = posts
            .inner()
            .aggregate(pipeline)
            .await
            .map_err(|e| ApiError::Database(format!("Aggregation failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| ApiError::Database(format!("Cursor failed: {}", e)))?;

        let (total_views, total_likes, total_comments) = totals
            .first()
            .map(|d| {
                (
                    doc_i64(d, "views"),
                    doc_i64(d, "likes"),
                    doc_i64(d, "comments"),
                )
            })
            .unwrap_or((0, 0, 0));

        let recent = self
            .find_page(
                doc! { "author": author },
                doc! { "publishedAt": -1 },
                0,
                30,
            )
            .await?;

        Ok(AnalyticsResponse {
            total_posts,
            total_views,
            total_likes,
            total_comments,
            recent_views: recent.iter().map(PostStatRow::from_post).collect(),
        })
    }

    async fn detail_without_related(&self, post: PostDoc) -> Result<PostDetail> {
        let mut summaries = self.summarize(std::slice::from_ref(&post)).await?;
        let summary = summaries.remove(0);

        let now_ms = DateTime::now().timestamp_millis();
        let published_ms = post.published_at.map(|d| d.timestamp_millis()).unwrap_or(now_ms);

        Ok(PostDetail {
            content: post.content,
            shares: post.shares,
            status: post.status,
            seo_title: post.seo_title,
            seo_description: post.seo_description,
            last_modified: post.last_modified,
            engagement_score: domain::engagement_score(
                post.likes_count,
                post.comments_count,
                post.views,
            ),
            popularity_score: domain::popularity_score(
                post.likes_count,
                post.comments_count,
                post.views,
                published_ms,
                now_ms,
            ),
            related_posts: Vec::new(),
            post: summary,
        })
    }
}

/// Filter for the trending feed: published within the last 7 days
fn trending_filter(now_ms: i64) -> Document {
    let window_start = DateTime::from_millis(now_ms - TRENDING_WINDOW_DAYS * 86_400_000);
    doc! {
        "status": "published",
        "isPublished": true,
        "publishedAt": { "$gte": window_start },
    }
}

fn score_posts(posts: Vec<PostDoc>) -> Vec<(PostDoc, f64)> {
    let now_ms = DateTime::now().timestamp_millis();
    posts
        .into_iter()
        .map(|p| {
            let published_ms = p.published_at.map(|d| d.timestamp_millis()).unwrap_or(now_ms);
            let score = domain::popularity_score(
                p.likes_count,
                p.comments_count,
                p.views,
                published_ms,
                now_ms,
            );
            (p, score)
        })
        .collect()
}

/// Popularity desc, likes desc, views desc
fn sort_by_popularity(scored: &mut [(PostDoc, f64)]) {
    scored.sort_by(|(a, sa), (b, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.likes_count.cmp(&a.likes_count))
            .then(b.views.cmp(&a.views))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_with(likes: i64, views: i64, published_days_ago: i64) -> PostDoc {
        let mut p = PostDoc::new(
            ObjectId::new(),
            "t".into(),
            format!("t-{}-{}", likes, views),
            "c".into(),
        );
        p.id = Some(ObjectId::new());
        p.likes_count = likes;
        p.views = views;
        p.published_at = Some(DateTime::from_millis(
            DateTime::now().timestamp_millis() - published_days_ago * 86_400_000,
        ));
        p
    }

    #[test]
    fn test_popularity_ordering_prefers_fresh_engagement() {
        // Same engagement, older post scores lower
        let fresh = post_with(10, 100, 0);
        let stale = post_with(10, 100, 6);
        let mut scored = score_posts(vec![stale.clone(), fresh.clone()]);
        sort_by_popularity(&mut scored);
        assert_eq!(scored[0].0.id, fresh.id);
        assert_eq!(scored[1].0.id, stale.id);
    }

    #[test]
    fn test_popularity_ties_break_on_likes_then_views() {
        let a = post_with(5, 200, 0);
        let b = post_with(8, 100, 0);
        // Identical scores so the tiebreak decides
        let mut scored = vec![(a.clone(), 1.0), (b.clone(), 1.0)];
        sort_by_popularity(&mut scored);
        assert_eq!(scored[0].0.id, b.id);

        let c = post_with(8, 300, 0);
        let mut scored = vec![(b.clone(), 1.0), (c.clone(), 1.0)];
        sort_by_popularity(&mut scored);
        assert_eq!(scored[0].0.id, c.id);
    }

    #[test]
    fn test_trending_window_is_seven_days() {
        let now_ms = 1_756_000_000_000;
        let filter = trending_filter(now_ms);

        let bound = filter
            .get_document("publishedAt")
            .unwrap()
            .get_datetime("$gte")
            .unwrap();
        assert_eq!(now_ms - bound.timestamp_millis(), 7 * 86_400_000);
        // Only published posts are candidates, however high their score
        assert_eq!(filter.get_str("status").unwrap(), "published");
        assert!(filter.get_bool("isPublished").unwrap());
    }

    #[test]
    fn test_feed_envelope_wraps_posts() {
        let feed = PostFeed { posts: Vec::new() };
        let json = serde_json::to_value(&feed).unwrap();
        assert!(json["posts"].is_array());
    }

    #[test]
    fn test_update_request_ignores_protected_fields() {
        // author/slug/id are not representable in UpdatePostRequest
        let req: UpdatePostRequest = serde_json::from_str(
            r#"{"title":"New","author":"65f000000000000000000001","slug":"hijack","_id":"x"}"#,
        )
        .unwrap();
        assert_eq!(req.title.as_deref(), Some("New"));
    }

}
