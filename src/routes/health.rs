//! Health and version endpoints
//!
//! /health is a liveness probe: it always returns 200 while the process
//! runs, and reports database reachability in the body for callers that
//! care. /version exposes build provenance for deployment verification.

use bson::doc;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    /// 'online' when the database answers, 'degraded' otherwise
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub mode: &'static str,
    pub timestamp: String,
}

/// Handle liveness probe (/health)
pub async fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let database = match &state.mongo {
        Some(mongo) => {
            let ping = mongo
                .inner()
                .database(mongo.db_name())
                .run_command(doc! { "ping": 1 })
                .await;
            if ping.is_ok() {
                "connected"
            } else {
                "unreachable"
            }
        }
        None => "unavailable",
    };

    let response = HealthResponse {
        healthy: true,
        status: if database == "connected" {
            "online"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        database,
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());

    // Liveness probe: always 200 while the process is running
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "quillstack",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
