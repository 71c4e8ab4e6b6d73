use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{response::ApiResponse, state::AppState};

#[derive(Serialize, ToSchema)]
pub struct Health {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Serialize, ToSchema)]
pub struct ServiceInfo {
    pub application: ApplicationInfo,
    pub system: SystemInfo,
}

#[derive(Serialize, ToSchema)]
pub struct ApplicationInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

#[derive(Serialize, ToSchema)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub cpu_cores: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database health", body = ApiResponse<Health>)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Health>> {
    let database_up = state.db().conn().ping().await.is_ok();

    Json(ApiResponse::success(Health {
        status: if database_up { "up" } else { "degraded" },
        database: if database_up {
            "connected"
        } else {
            "disconnected"
        },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    }))
}

#[utoipa::path(
    get,
    path = "/health/info",
    responses(
        (status = 200, description = "Build and host details", body = ApiResponse<ServiceInfo>)
    )
)]
pub async fn info() -> Json<ApiResponse<ServiceInfo>> {
    Json(ApiResponse::success(ServiceInfo {
        application: ApplicationInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
        },
        system: SystemInfo {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            cpu_cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        },
    }))
}

#[utoipa::path(
    get,
    path = "/health/ping",
    responses(
        (status = 200, description = "Liveness probe", body = ApiResponse<String>)
    )
)]
pub async fn ping() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("pong"))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/info", get(info))
        .route("/health/ping", get(ping))
        .with_state(state)
}
