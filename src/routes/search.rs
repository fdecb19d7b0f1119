//! Search endpoints

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use crate::routes::{api_error_response, get_services, json_response, query_param, FullBody};
use crate::server::AppState;
use crate::services::search::SearchType;

/// GET /search?q=...&type=all|posts|users&page=...&limit=...
pub async fn handle_search(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let query = req.uri().query();
    let q = query_param(query, "q").unwrap_or_default();
    let search_type = query_param(query, "type")
        .map(|v| SearchType::parse(&v))
        .unwrap_or_default();
    let page = query_param(query, "page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let limit = query_param(query, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    match services.search.search(&q, search_type, page, limit).await {
        Ok(results) => json_response(StatusCode::OK, &results),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// GET /search/suggestions?q=...
///
/// Unlike /search, a too-short query is answered with an empty suggestion
/// set so typeahead clients can call this on every keystroke.
pub async fn handle_search_suggestions(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let q = query_param(req.uri().query(), "q").unwrap_or_default();

    match services.search.suggestions(&q).await {
        Ok(suggestions) => json_response(StatusCode::OK, &suggestions),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}
