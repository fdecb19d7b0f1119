//! HTTP route handlers
//!
//! Handlers parse the request, call into the service layer, and render the
//! result. Auth failures and malformed input are turned into responses
//! here; service errors map through `ApiError::status_code()`.

pub mod comments;
pub mod health;
pub mod posts;
pub mod search;
pub mod stats;

pub use comments::{handle_create_comment, handle_delete_comment, handle_list_comments};
pub use health::{health_check, version_info};
pub use posts::{
    handle_bookmark_post, handle_create_post, handle_delete_post, handle_featured_posts,
    handle_get_post, handle_like_post, handle_list_posts, handle_my_posts, handle_post_analytics,
    handle_share_post, handle_trending_posts, handle_update_post,
};
pub use search::{handle_search, handle_search_suggestions};
pub use stats::{handle_category_stats, handle_platform_stats, handle_tag_stats};

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::auth::{extract_token_from_header, Claims, JwtValidator};
use crate::server::{AppState, Services};
use crate::types::ApiError;

pub type FullBody = Full<Bytes>;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

/// Serialize a value as a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// JSON error body with an optional machine-readable code
pub fn error_response(status: StatusCode, error: &str, code: Option<&str>) -> Response<FullBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
            code: code.map(|c| c.to_string()),
        },
    )
}

/// Render a service error. Server-side failure detail is only exposed in
/// dev mode; clients get a generic message and the log gets the rest.
pub fn api_error_response(err: &ApiError, dev_mode: bool) -> Response<FullBody> {
    let status = err.status_code();
    let code = match err {
        ApiError::BadRequest(_) => "BAD_REQUEST",
        ApiError::Unauthorized(_) | ApiError::Auth(_) => "UNAUTHORIZED",
        ApiError::Forbidden(_) => "FORBIDDEN",
        ApiError::NotFound(_) => "NOT_FOUND",
        ApiError::Database(_) => "DATABASE_ERROR",
        ApiError::Config(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
    };

    if err.is_client_error() || dev_mode {
        error_response(status, &err.to_string(), Some(code))
    } else {
        error!("Request failed: {}", err);
        let generic = match err {
            ApiError::Database(_) => "Database unavailable",
            _ => "Internal server error",
        };
        error_response(status, generic, Some(code))
    }
}

fn get_auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

#[allow(clippy::result_large_err)]
fn get_jwt_validator(state: &AppState) -> Result<JwtValidator, Response<FullBody>> {
    if state.args.dev_mode {
        Ok(JwtValidator::new_dev())
    } else {
        match &state.args.jwt_secret {
            Some(secret) => JwtValidator::new(secret.clone(), state.args.jwt_expiry_seconds)
                .map_err(|e| {
                    error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &format!("JWT config error: {e}"),
                        Some("CONFIG_ERROR"),
                    )
                }),
            None => Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "JWT_SECRET not configured",
                Some("CONFIG_ERROR"),
            )),
        }
    }
}

/// Validate the bearer token and return its claims
#[allow(clippy::result_large_err)]
pub fn require_auth(
    req: &Request<Incoming>,
    state: &AppState,
) -> Result<Claims, Response<FullBody>> {
    let token = match extract_token_from_header(get_auth_header(req)) {
        Some(t) => t,
        None => {
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "No token provided",
                Some("NO_TOKEN"),
            ))
        }
    };

    let jwt = get_jwt_validator(state)?;
    let result = jwt.verify_token(token);

    if !result.valid {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            result.error.as_deref().unwrap_or("Invalid token"),
            Some("INVALID_TOKEN"),
        ));
    }

    result.claims.ok_or_else(|| {
        error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid token",
            Some("INVALID_TOKEN"),
        )
    })
}

/// The authenticated user's ObjectId from claims
#[allow(clippy::result_large_err)]
pub fn caller_id(claims: &Claims) -> Result<ObjectId, Response<FullBody>> {
    ObjectId::parse_str(&claims.user_id).map_err(|_| {
        error_response(
            StatusCode::UNAUTHORIZED,
            "Token subject is not a valid user ID",
            Some("INVALID_TOKEN"),
        )
    })
}

/// The service layer, or 503 when MongoDB never came up
#[allow(clippy::result_large_err)]
pub(crate) fn get_services(state: &AppState) -> Result<&Services, Response<FullBody>> {
    state.services.as_ref().ok_or_else(|| {
        error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Database not available",
            Some("DATABASE_ERROR"),
        )
    })
}

/// Collect and deserialize a JSON request body
pub async fn read_json<T: DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, Response<FullBody>> {
    let body_bytes = match req.into_body().collect().await {
        Ok(b) => b.to_bytes(),
        Err(_) => return Err(error_response(StatusCode::BAD_REQUEST, "Invalid body", None)),
    };

    serde_json::from_slice(&body_bytes)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid JSON", None))
}

/// Decode one query parameter value
pub(crate) fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    for pair in query?.split('&') {
        if let Some((k, value)) = pair.split_once('=') {
            if k == key {
                return Some(urlencoding::decode(value).unwrap_or_default().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_decoding() {
        let q = Some("q=hello%20world&page=2");
        assert_eq!(query_param(q, "q").as_deref(), Some("hello world"));
        assert_eq!(query_param(q, "page").as_deref(), Some("2"));
        assert_eq!(query_param(q, "missing"), None);
        assert_eq!(query_param(None, "q"), None);
    }

    #[test]
    fn test_api_error_response_hides_detail_outside_dev() {
        let err = ApiError::Database("connection refused to 10.0.0.1".into());
        let resp = api_error_response(&err, false);
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::BadRequest("Title is required".into());
        let resp = api_error_response(&err, false);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
