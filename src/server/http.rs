//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Each accepted
//! connection gets its own task; handlers share state through `AppState`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Args;
use crate::db::MongoClient;
use crate::routes;
use crate::services::{CommentService, PostService, SearchService, StatsService};
use crate::types::ApiError;

type FullBody = Full<Bytes>;

/// Service layer handles, one per entity
#[derive(Clone)]
pub struct Services {
    pub posts: PostService,
    pub comments: CommentService,
    pub search: SearchService,
    pub stats: StatsService,
}

impl Services {
    pub fn new(mongo: MongoClient) -> Self {
        Self {
            posts: PostService::new(mongo.clone()),
            comments: CommentService::new(mongo.clone()),
            search: SearchService::new(mongo.clone()),
            stats: StatsService::new(mongo),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// None when MongoDB never came up (dev mode only); handlers answer 503
    pub services: Option<Services>,
}

impl AppState {
    /// State without a database. Only valid in dev mode, where the server
    /// stays up to serve /health and /version while MongoDB is absent.
    pub fn new(args: Args) -> Self {
        Self {
            args,
            mongo: None,
            services: None,
        }
    }

    pub fn with_mongo(args: Args, mongo: MongoClient) -> Self {
        Self {
            args,
            services: Some(Services::new(mongo.clone())),
            mongo: Some(mongo),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), ApiError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - using fixed JWT secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<FullBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            routes::health_check(state).await
        }
        (&Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (&Method::OPTIONS, _) => preflight_response(),

        (&Method::GET, "/posts") => routes::handle_list_posts(req, state).await,
        (&Method::POST, "/posts") => routes::handle_create_post(req, state).await,
        (&Method::GET, "/posts/trending") => routes::handle_trending_posts(req, state).await,
        (&Method::GET, "/posts/featured") => routes::handle_featured_posts(req, state).await,
        (&Method::GET, "/posts/analytics") => routes::handle_post_analytics(req, state).await,
        (&Method::GET, "/posts/user/me") => routes::handle_my_posts(req, state).await,

        (&Method::GET, "/search") => routes::handle_search(req, state).await,
        (&Method::GET, "/search/suggestions") => {
            routes::handle_search_suggestions(req, state).await
        }

        (&Method::GET, "/stats") => routes::handle_platform_stats(state).await,
        (&Method::GET, "/stats/categories") => routes::handle_category_stats(state).await,
        (&Method::GET, "/stats/tags") => routes::handle_tag_stats(state).await,

        // Parameterized paths
        _ => {
            let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
            match (&method, segments.as_slice()) {
                (&Method::GET, ["posts", id_or_slug]) => {
                    routes::handle_get_post(state, id_or_slug).await
                }
                (&Method::PUT, ["posts", id]) => routes::handle_update_post(req, state, id).await,
                (&Method::DELETE, ["posts", id]) => {
                    routes::handle_delete_post(req, state, id).await
                }
                (&Method::POST, ["posts", id, "like"]) => {
                    routes::handle_like_post(req, state, id).await
                }
                (&Method::POST, ["posts", id, "bookmark"]) => {
                    routes::handle_bookmark_post(req, state, id).await
                }
                (&Method::POST, ["posts", id, "share"]) => {
                    routes::handle_share_post(state, id).await
                }
                (&Method::GET, ["posts", id, "comments"]) => {
                    routes::handle_list_comments(req, state, id).await
                }
                (&Method::POST, ["posts", id, "comments"]) => {
                    routes::handle_create_comment(req, state, id).await
                }
                (&Method::DELETE, ["comments", id]) => {
                    routes::handle_delete_comment(req, state, id).await
                }
                _ => not_found_response(&path),
            }
        }
    };

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<FullBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<FullBody> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
