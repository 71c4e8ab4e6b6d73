use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::{
    entities::users,
    error::ApiResult,
    repo::users::UserPageQuery,
    response::{ApiResponse, PageResult, CODE_ERROR},
    service::users::{CreateUserInput, UpdateUserInput, UserStatistics},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub real_name: Option<String>,
    pub avatar: Option<String>,
    pub status: Option<i16>,
    pub remark: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub real_name: Option<String>,
    pub avatar: Option<String>,
    pub status: Option<i16>,
    pub remark: Option<String>,
}

/// The password column never leaves the service boundary.
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub real_name: Option<String>,
    pub avatar: Option<String>,
    pub status: i16,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for UserResponse {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            phone: model.phone,
            real_name: model.real_name,
            avatar: model.avatar,
            status: model.status,
            remark: model.remark,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserStatisticsResponse {
    pub total_users: u64,
    pub active_users: u64,
    pub disabled_users: u64,
}

impl From<UserStatistics> for UserStatisticsResponse {
    fn from(stats: UserStatistics) -> Self {
        Self {
            total_users: stats.total_users,
            active_users: stats.active_users,
            disabled_users: stats.disabled_users,
        }
    }
}

fn default_current() -> u64 {
    1
}

fn default_size() -> u64 {
    10
}

#[derive(Deserialize, IntoParams)]
pub struct PageParams {
    #[serde(default = "default_current")]
    pub current: u64,
    #[serde(default = "default_size")]
    pub size: u64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub status: Option<i16>,
}

#[derive(Deserialize, IntoParams)]
pub struct StatusParams {
    pub status: i16,
}

#[derive(Deserialize, IntoParams)]
pub struct PasswordParams {
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(Deserialize, IntoParams)]
pub struct ExistsParams {
    pub value: String,
}

#[utoipa::path(
    get,
    path = "/user/page",
    params(PageParams),
    responses(
        (status = 200, description = "Paged users", body = ApiResponse<PageResult<UserResponse>>),
        (status = 400, description = "Invalid page parameters")
    )
)]
pub async fn get_user_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<ApiResponse<PageResult<UserResponse>>>> {
    let query = UserPageQuery {
        current: params.current,
        size: params.size,
        username: params.username,
        email: params.email,
        status: params.status,
    };

    let (records, total) = state.users().get_user_page(query).await?;
    let records = records.into_iter().map(UserResponse::from).collect();
    let page = PageResult::of(records, total, params.current, params.size);

    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    get,
    path = "/user/statistics",
    responses(
        (status = 200, description = "User totals by status", body = ApiResponse<UserStatisticsResponse>)
    )
)]
pub async fn get_user_statistics(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ApiResponse<UserStatisticsResponse>>> {
    let stats = state.users().get_user_statistics().await?;
    Ok(Json(ApiResponse::success(stats.into())))
}

#[utoipa::path(
    get,
    path = "/user/{id}",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User, or null data when absent", body = ApiResponse<UserResponse>)
    )
)]
pub async fn get_user_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state.users().get_user(id).await?;
    Ok(Json(ApiResponse::success_optional(
        user.map(UserResponse::from),
    )))
}

#[utoipa::path(
    get,
    path = "/user/username/{username}",
    params(
        ("username" = String, Path, description = "Username")
    ),
    responses(
        (status = 200, description = "User, or null data when absent", body = ApiResponse<UserResponse>)
    )
)]
pub async fn get_user_by_username(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state.users().get_user_by_username(&username).await?;
    Ok(Json(ApiResponse::success_optional(
        user.map(UserResponse::from),
    )))
}

#[utoipa::path(
    post,
    path = "/user",
    request_body = CreateUser,
    responses(
        (status = 200, description = "Created user", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Username, email or phone already taken")
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUser>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let input = CreateUserInput {
        username: payload.username,
        password: payload.password,
        email: payload.email,
        phone: payload.phone,
        real_name: payload.real_name,
        avatar: payload.avatar,
        status: payload.status,
        remark: payload.remark,
    };

    let created = state.users().create_user(input).await?;
    Ok(Json(ApiResponse::success_with_message(
        "user created",
        created.into(),
    )))
}

#[utoipa::path(
    put,
    path = "/user",
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username, email or phone already taken")
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateUser>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let input = UpdateUserInput {
        id: payload.id,
        username: payload.username,
        password: payload.password,
        email: payload.email,
        phone: payload.phone,
        real_name: payload.real_name,
        avatar: payload.avatar,
        status: payload.status,
        remark: payload.remark,
    };

    let updated = state.users().update_user(input).await?;
    Ok(Json(ApiResponse::success_with_message(
        "user updated",
        updated.into(),
    )))
}

#[utoipa::path(
    delete,
    path = "/user/{id}",
    params(
        ("id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Deletion outcome", body = ApiResponse<bool>),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let deleted = state.users().delete_user(id).await?;
    if deleted {
        Ok(Json(ApiResponse::success_with_message("user deleted", true)))
    } else {
        Ok(Json(ApiResponse::error(CODE_ERROR, "user delete failed")))
    }
}

#[utoipa::path(
    delete,
    path = "/user/batch",
    request_body = Vec<i64>,
    responses(
        (status = 200, description = "Deletion outcome", body = ApiResponse<bool>),
        (status = 400, description = "Empty id list")
    )
)]
pub async fn delete_users(
    State(state): State<Arc<AppState>>,
    Json(ids): Json<Vec<i64>>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let deleted = state.users().delete_users(&ids).await?;
    if deleted {
        Ok(Json(ApiResponse::success_with_message(
            "users deleted",
            true,
        )))
    } else {
        Ok(Json(ApiResponse::error(CODE_ERROR, "users delete failed")))
    }
}

#[utoipa::path(
    put,
    path = "/user/{id}/status",
    params(
        ("id" = i64, Path, description = "User id"),
        StatusParams
    ),
    responses(
        (status = 200, description = "Update outcome", body = ApiResponse<bool>),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<StatusParams>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let updated = state.users().update_user_status(id, params.status).await?;
    if updated {
        Ok(Json(ApiResponse::success_with_message(
            "user status updated",
            true,
        )))
    } else {
        Ok(Json(ApiResponse::error(
            CODE_ERROR,
            "user status update failed",
        )))
    }
}

#[utoipa::path(
    put,
    path = "/user/{id}/password",
    params(
        ("id" = i64, Path, description = "User id"),
        PasswordParams
    ),
    responses(
        (status = 200, description = "Reset outcome", body = ApiResponse<bool>),
        (status = 400, description = "Blank password"),
        (status = 404, description = "User not found")
    )
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<PasswordParams>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let reset = state
        .users()
        .reset_password(id, &params.new_password)
        .await?;
    if reset {
        Ok(Json(ApiResponse::success_with_message(
            "password reset",
            true,
        )))
    } else {
        Ok(Json(ApiResponse::error(CODE_ERROR, "password reset failed")))
    }
}

#[utoipa::path(
    get,
    path = "/user/exists/username",
    params(ExistsParams),
    responses(
        (status = 200, description = "Whether the username is taken", body = ApiResponse<bool>)
    )
)]
pub async fn exists_by_username(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExistsParams>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let exists = state.users().exists_by_username(&params.value).await?;
    Ok(Json(ApiResponse::success(exists)))
}

#[utoipa::path(
    get,
    path = "/user/exists/email",
    params(ExistsParams),
    responses(
        (status = 200, description = "Whether the email is taken", body = ApiResponse<bool>)
    )
)]
pub async fn exists_by_email(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExistsParams>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let exists = state.users().exists_by_email(&params.value).await?;
    Ok(Json(ApiResponse::success(exists)))
}

#[utoipa::path(
    get,
    path = "/user/exists/phone",
    params(ExistsParams),
    responses(
        (status = 200, description = "Whether the phone is taken", body = ApiResponse<bool>)
    )
)]
pub async fn exists_by_phone(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExistsParams>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let exists = state.users().exists_by_phone(&params.value).await?;
    Ok(Json(ApiResponse::success(exists)))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/user/page", get(get_user_page))
        .route("/user/statistics", get(get_user_statistics))
        .route("/user/exists/username", get(exists_by_username))
        .route("/user/exists/email", get(exists_by_email))
        .route("/user/exists/phone", get(exists_by_phone))
        .route("/user/username/:username", get(get_user_by_username))
        .route("/user/batch", delete(delete_users))
        .route("/user/:id", get(get_user_by_id))
        .route("/user/:id", delete(delete_user))
        .route("/user/:id/status", put(update_user_status))
        .route("/user/:id/password", put(reset_password))
        .route("/user", post(create_user))
        .route("/user", put(update_user))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::users::InMemoryUsersRepo;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sea_orm::DatabaseConnection;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestDatabaseClient {
        conn: DatabaseConnection,
    }

    impl crate::state::DatabaseClient for TestDatabaseClient {
        fn conn(&self) -> &DatabaseConnection {
            &self.conn
        }
    }

    fn app() -> Router {
        let db = Arc::new(TestDatabaseClient {
            conn: DatabaseConnection::Disconnected,
        });
        let state = AppState::assemble(db, Arc::new(InMemoryUsersRepo::new()));
        routes(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn create_user_via_api(app: &Router, username: &str, extra: Value) -> Value {
        let mut payload = json!({ "username": username, "password": "secret123" });
        if let (Some(base), Some(more)) = (payload.as_object_mut(), extra.as_object()) {
            for (key, value) in more {
                base.insert(key.clone(), value.clone());
            }
        }
        let (status, body) = send(app, json_request("POST", "/user", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        body["data"].clone()
    }

    #[tokio::test]
    async fn create_returns_envelope_without_password() {
        let app = app();
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/user",
                json!({
                    "username": "alice",
                    "password": "secret123",
                    "email": "alice@example.com"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert_eq!(body["message"], "user created");
        assert_eq!(body["data"]["username"], "alice");
        assert_eq!(body["data"]["email"], "alice@example.com");
        assert_eq!(body["data"]["status"], 0);
        assert!(body["data"].get("password").is_none());
        assert!(body["timestamp"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn get_missing_user_returns_null_data() {
        let app = app();
        let (status, body) = send(&app, get_request("/user/999")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn duplicate_username_maps_to_conflict() {
        let app = app();
        create_user_via_api(&app, "alice", json!({})).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/user",
                json!({ "username": "alice", "password": "secret123" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], 6002);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn invalid_payload_maps_to_bad_request() {
        let app = app();
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/user",
                json!({ "username": "ab", "password": "secret123" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn page_reports_window_math() {
        let app = app();
        for name in ["alice", "bob", "carol"] {
            create_user_via_api(&app, name, json!({})).await;
        }

        let (status, body) = send(&app, get_request("/user/page?current=1&size=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 3);
        assert_eq!(body["data"]["pages"], 2);
        assert_eq!(body["data"]["records"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["has_next"], true);

        // defaults kick in when the window is unspecified
        let (_, body) = send(&app, get_request("/user/page")).await;
        assert_eq!(body["data"]["current"], 1);
        assert_eq!(body["data"]["size"], 10);
        assert_eq!(body["data"]["records"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn lookup_and_exists_by_username() {
        let app = app();
        create_user_via_api(&app, "alice", json!({})).await;

        let (status, body) = send(&app, get_request("/user/username/alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "alice");

        let (_, body) = send(&app, get_request("/user/exists/username?value=alice")).await;
        assert_eq!(body["data"], true);

        let (_, body) = send(&app, get_request("/user/exists/username?value=nobody")).await;
        assert_eq!(body["data"], false);
    }

    #[tokio::test]
    async fn status_and_password_updates_return_true() {
        let app = app();
        let created = create_user_via_api(&app, "alice", json!({})).await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) =
            send(&app, empty_request("PUT", &format!("/user/{id}/status?status=1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], true);

        let (_, body) = send(&app, get_request(&format!("/user/{id}"))).await;
        assert_eq!(body["data"]["status"], 1);

        let (status, body) = send(
            &app,
            empty_request("PUT", &format!("/user/{id}/password?newPassword=fresh9")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], true);
    }

    #[tokio::test]
    async fn delete_then_lookups_miss() {
        let app = app();
        let created = create_user_via_api(&app, "alice", json!({})).await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(&app, empty_request("DELETE", &format!("/user/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"], true);

        let (_, body) = send(&app, get_request(&format!("/user/{id}"))).await;
        assert!(body["data"].is_null());

        let (status, body) = send(&app, empty_request("DELETE", &format!("/user/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 6001);
    }

    #[tokio::test]
    async fn batch_delete_removes_listed_users() {
        let app = app();
        let a = create_user_via_api(&app, "alice", json!({})).await;
        let b = create_user_via_api(&app, "bob", json!({})).await;
        create_user_via_api(&app, "carol", json!({})).await;

        let ids = json!([a["id"], b["id"]]);
        let (status, body) = send(&app, json_request("DELETE", "/user/batch", ids)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], true);

        let (_, body) = send(&app, get_request("/user/statistics")).await;
        assert_eq!(body["data"]["total_users"], 1);

        let (status, body) = send(&app, json_request("DELETE", "/user/batch", json!([]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn update_merges_provided_fields() {
        let app = app();
        let created = create_user_via_api(&app, "alice", json!({})).await;

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                "/user",
                json!({ "id": created["id"], "real_name": "Alice" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "user updated");
        assert_eq!(body["data"]["real_name"], "Alice");
        assert_eq!(body["data"]["username"], "alice");

        let (status, body) = send(
            &app,
            json_request("PUT", "/user", json!({ "real_name": "Nobody" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn statistics_count_by_status() {
        let app = app();
        create_user_via_api(&app, "alice", json!({})).await;
        create_user_via_api(&app, "bob", json!({})).await;
        create_user_via_api(&app, "carol", json!({ "status": 1 })).await;

        let (status, body) = send(&app, get_request("/user/statistics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_users"], 3);
        assert_eq!(body["data"]["active_users"], 2);
        assert_eq!(body["data"]["disabled_users"], 1);
    }
}
