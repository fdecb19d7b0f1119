//! Statistics endpoints

use hyper::{Response, StatusCode};
use std::sync::Arc;

use crate::routes::{api_error_response, get_services, json_response, FullBody};
use crate::server::AppState;

/// GET /stats
pub async fn handle_platform_stats(state: Arc<AppState>) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.stats.platform().await {
        Ok(stats) => json_response(StatusCode::OK, &stats),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// GET /stats/categories
pub async fn handle_category_stats(state: Arc<AppState>) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.stats.categories().await {
        Ok(rows) => json_response(StatusCode::OK, &rows),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}

/// GET /stats/tags
pub async fn handle_tag_stats(state: Arc<AppState>) -> Response<FullBody> {
    let services = match get_services(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services.stats.tags().await {
        Ok(rows) => json_response(StatusCode::OK, &rows),
        Err(e) => api_error_response(&e, state.args.dev_mode),
    }
}
