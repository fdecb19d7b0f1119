//! Post endpoints
//!
//! Listing and reads are public; writes and engagement toggles require a
//! valid bearer token. Share counting is deliberately unauthenticated.

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::schemas::{PostQuery, PostSort};
use crate::routes::{
    api_error_response, caller_id, get_services, json_response, query_param, read_json,
    require_auth, FullBody,
};
use crate::server::AppState;
use crate::services::posts::{CreatePostRequest, UpdatePostRequest};

fn parse_post_query(query: Option<&str>) -> PostQuery {
    PostQuery {
        q: query_param(query, "q").filter(|s| !s.trim().is_empty()),
        category: query_param(query, "category"),
        tag: query_param(query, "tag"),
        featured: query_param(query, "featured")
            .map(|v| v == "true")
            .unwrap_or(false),
        sort: query_param(query, "sort")
            .map(|v| PostSort::parse(&v))
            .unwrap_or_default(),
        page: query_param(query, "page")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1),
        limit: query_param(query, "limit")
            .and_then(|v| v.parse().ok())
            .unwrap_or(12),
    }
}

fn parse_limit(query: Option<&str>, default: u32) -> u32 {
    query_param(query, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// GET /posts
pub async fn handle_list_posts(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let query = parse_post_query(req.uri().query());

    match services.posts.list(&query).await {
        Ok(listing) => json_response(StatusCode::OK, &listing),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// GET /posts/{idOrSlug}
pub async fn handle_get_post(state: Arc<AppState>, id_or_slug: &str) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.posts.get(id_or_slug).await {
        Ok(detail) => json_response(StatusCode::OK, &detail),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// POST /posts
pub async fn handle_create_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let author = match caller_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let services = match get_services(&state) {
        Ok(s) => s.clone(),
        Err(resp) => return resp,
    };
    let body: CreatePostRequest = match read_json(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.posts.create(author, body).await {
        Ok(detail) => json_response(StatusCode::CREATED, &detail),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// PUT /posts/{id}
pub async fn handle_update_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
    post_id: &str,
) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let caller = match caller_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let services = match get_services(&state) {
        Ok(s) => s.clone(),
        Err(resp) => return resp,
    };
    let body: UpdatePostRequest = match read_json(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.posts.update(post_id, caller, body).await {
        Ok(detail) => json_response(StatusCode::OK, &detail),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// DELETE /posts/{id}
pub async fn handle_delete_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
    post_id: &str,
) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let caller = match caller_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.posts.delete(post_id, caller).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": true })),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// POST /posts/{id}/like
pub async fn handle_like_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
    post_id: &str,
) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user = match caller_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.posts.like(post_id, user).await {
        Ok(result) => json_response(StatusCode::OK, &result),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// POST /posts/{id}/bookmark
pub async fn handle_bookmark_post(
    req: Request<Incoming>,
    state: Arc<AppState>,
    post_id: &str,
) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let user = match caller_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.posts.bookmark(post_id, user).await {
        Ok(result) => json_response(StatusCode::OK, &result),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// POST /posts/{id}/share
pub async fn handle_share_post(state: Arc<AppState>, post_id: &str) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.posts.share(post_id).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "shared": true })),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// GET /posts/trending
pub async fn handle_trending_posts(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let limit = parse_limit(req.uri().query(), 10);

    match services.posts.trending(limit).await {
        Ok(posts) => json_response(StatusCode::OK, &posts),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// GET /posts/featured
pub async fn handle_featured_posts(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let limit = parse_limit(req.uri().query(), 5);

    match services.posts.featured(limit).await {
        Ok(posts) => json_response(StatusCode::OK, &posts),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// GET /posts/analytics
pub async fn handle_post_analytics(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let author = match caller_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.posts.analytics(author).await {
        Ok(analytics) => json_response(StatusCode::OK, &analytics),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// GET /posts/user/me
pub async fn handle_my_posts(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let claims = match require_auth(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let author = match caller_id(&claims) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let query = req.uri().query();
    let page = query_param(query, "page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let limit = parse_limit(query, 10);

    match services.posts.my_posts(author, page, limit).await {
        Ok(listing) => json_response(StatusCode::OK, &listing),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post_query_defaults() {
        let q = parse_post_query(None);
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 12);
        assert_eq!(q.sort, PostSort::Newest);
        assert!(q.q.is_none());
        assert!(!q.featured);
    }

    #[test]
    fn test_parse_post_query_full() {
        let q = parse_post_query(Some(
            "q=rust%20async&category=dev&tag=tokio&featured=true&sort=popular&page=3&limit=25",
        ));
        assert_eq!(q.q.as_deref(), Some("rust async"));
        assert_eq!(q.category.as_deref(), Some("dev"));
        assert_eq!(q.tag.as_deref(), Some("tokio"));
        assert!(q.featured);
        assert_eq!(q.sort, PostSort::Popular);
        assert_eq!(q.page, 3);
        assert_eq!(q.limit, 25);
    }

    #[test]
    fn test_parse_post_query_blank_search_dropped() {
        let q = parse_post_query(Some("q=%20%20"));
        assert!(q.q.is_none());
    }

    #[test]
    fn test_parse_post_query_garbage_numbers() {
        let q = parse_post_query(Some("page=abc&limit=-5"));
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 12);
    }
}
