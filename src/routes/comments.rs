//! Comment endpoints
//!
//! Reading comments is public; creating and deleting require a bearer
//! token.

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use crate::routes::{
    api_error_response, caller_id, get_services, json_response, query_param, read_json,
    require_auth, FullBody,
};
use crate::server::AppState;
use crate::services::comments::CreateCommentRequest;

/// GET /posts/{id}/comments
pub async fn handle_list_comments(
    req: Request<Incoming>,
    state: Arc<AppState>,
    post_id: &str,
) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let query = req.uri().query();
    let page = query_param(query, "page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let limit = query_param(query, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(20);

    match services.comments.list(post_id, page, limit).await {
        Ok(listing) => json_response(StatusCode::OK, &listing),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// POST /posts/{id}/comments
pub async fn handle_create_comment(
    req: Request<Incoming>,
    state: Arc<AppState>,
    post_id: &str,
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
    let body: CreateCommentRequest = match read_json(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.comments.create(post_id, author, body).await {
        Ok(comment) => json_response(StatusCode::CREATED, &comment),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// DELETE /comments/{id}
pub async fn handle_delete_comment(
    req: Request<Incoming>,
    state: Arc<AppState>,
    comment_id: &str,
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

    match services.comments.delete(comment_id, caller).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": true })),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}
