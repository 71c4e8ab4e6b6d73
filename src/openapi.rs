use utoipa::OpenApi;

use crate::{
    handler,
    handler::{
        health::{Health, ServiceInfo},
        users::{CreateUser, UpdateUser, UserResponse, UserStatisticsResponse},
    },
    response::{ApiResponse, PageResult},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handler::health::health,
        handler::health::info,
        handler::health::ping,
        handler::users::get_user_page,
        handler::users::get_user_statistics,
        handler::users::get_user_by_id,
        handler::users::get_user_by_username,
        handler::users::create_user,
        handler::users::update_user,
        handler::users::delete_user,
        handler::users::delete_users,
        handler::users::update_user_status,
        handler::users::reset_password,
        handler::users::exists_by_username,
        handler::users::exists_by_email,
        handler::users::exists_by_phone
    ),
    components(schemas(
        Health,
        ServiceInfo,
        CreateUser,
        UpdateUser,
        UserResponse,
        UserStatisticsResponse,
        PageResult<UserResponse>,
        ApiResponse<Health>,
        ApiResponse<ServiceInfo>,
        ApiResponse<String>,
        ApiResponse<UserResponse>,
        ApiResponse<UserStatisticsResponse>,
        ApiResponse<PageResult<UserResponse>>,
        ApiResponse<bool>
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "users", description = "User administration")
    )
)]
pub struct ApiDoc;
