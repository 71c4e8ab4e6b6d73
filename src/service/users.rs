use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::{
    entities::users,
    error::ApiError,
    repo::users::{UserPageQuery, UsersRepo},
};

pub struct CreateUserInput {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub real_name: Option<String>,
    pub avatar: Option<String>,
    pub status: Option<i16>,
    pub remark: Option<String>,
}

pub struct UpdateUserInput {
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStatistics {
    pub total_users: u64,
    pub active_users: u64,
    pub disabled_users: u64,
}

#[async_trait]
pub trait UsersService: Send + Sync {
    async fn create_user(&self, input: CreateUserInput) -> Result<users::Model, ApiError>;
    async fn update_user(&self, input: UpdateUserInput) -> Result<users::Model, ApiError>;
    async fn get_user(&self, id: i64) -> Result<Option<users::Model>, ApiError>;
    async fn get_user_by_username(&self, username: &str)
        -> Result<Option<users::Model>, ApiError>;
    async fn delete_user(&self, id: i64) -> Result<bool, ApiError>;
    async fn delete_users(&self, ids: &[i64]) -> Result<bool, ApiError>;
    async fn update_user_status(&self, id: i64, status: i16) -> Result<bool, ApiError>;
    async fn reset_password(&self, id: i64, new_password: &str) -> Result<bool, ApiError>;
    async fn exists_by_username(&self, username: &str) -> Result<bool, ApiError>;
    async fn exists_by_email(&self, email: &str) -> Result<bool, ApiError>;
    async fn exists_by_phone(&self, phone: &str) -> Result<bool, ApiError>;
    async fn get_user_page(
        &self,
        query: UserPageQuery,
    ) -> Result<(Vec<users::Model>, u64), ApiError>;
    async fn get_user_statistics(&self) -> Result<UserStatistics, ApiError>;
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Blank optional strings count as not provided.
fn normalize_optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_blank(v))
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if is_blank(username) {
        return Err(ApiError::validation("username must not be blank"));
    }
    let length = username.chars().count();
    if !(3..=50).contains(&length) {
        return Err(ApiError::validation("username must be 3 to 50 characters"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if is_blank(password) {
        return Err(ApiError::validation("password must not be blank"));
    }
    let length = password.chars().count();
    if !(6..=100).contains(&length) {
        return Err(ApiError::validation("password must be 6 to 100 characters"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if !email.contains('@') || email.chars().count() > 100 {
        return Err(ApiError::validation("invalid email"));
    }
    Ok(())
}

fn validate_length(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn validate_status(status: i16) -> Result<(), ApiError> {
    if status != users::STATUS_ACTIVE && status != users::STATUS_DISABLED {
        return Err(ApiError::validation("status must be 0 or 1"));
    }
    Ok(())
}

pub struct UsersServiceImpl {
    users_repo: Arc<dyn UsersRepo>,
}

impl UsersServiceImpl {
    pub fn new(users_repo: Arc<dyn UsersRepo>) -> Self {
        Self { users_repo }
    }

    async fn ensure_username_available(&self, username: &str) -> Result<(), ApiError> {
        if self.users_repo.find_by_username(username).await?.is_some() {
            return Err(ApiError::conflict("username already exists"));
        }
        Ok(())
    }

    async fn ensure_email_available(&self, email: &str) -> Result<(), ApiError> {
        if self.users_repo.find_by_email(email).await?.is_some() {
            return Err(ApiError::conflict("email already exists"));
        }
        Ok(())
    }

    async fn ensure_phone_available(&self, phone: &str) -> Result<(), ApiError> {
        if self.users_repo.find_by_phone(phone).await?.is_some() {
            return Err(ApiError::conflict("phone already exists"));
        }
        Ok(())
    }
}

#[async_trait]
impl UsersService for UsersServiceImpl {
    async fn create_user(&self, input: CreateUserInput) -> Result<users::Model, ApiError> {
        validate_username(&input.username)?;
        validate_password(&input.password)?;

        let email = normalize_optional(input.email);
        if let Some(email) = &email {
            validate_email(email)?;
        }
        let phone = normalize_optional(input.phone);
        if let Some(phone) = &phone {
            validate_length("phone", phone, 20)?;
        }
        if let Some(real_name) = &input.real_name {
            validate_length("real_name", real_name, 50)?;
        }
        if let Some(avatar) = &input.avatar {
            validate_length("avatar", avatar, 500)?;
        }
        if let Some(remark) = &input.remark {
            validate_length("remark", remark, 500)?;
        }
        let status = input.status.unwrap_or(users::STATUS_ACTIVE);
        validate_status(status)?;

        self.ensure_username_available(&input.username).await?;
        if let Some(email) = &email {
            self.ensure_email_available(email).await?;
        }
        if let Some(phone) = &phone {
            self.ensure_phone_available(phone).await?;
        }

        // id and the audit columns are assigned by the store.
        let now = Utc::now().into();
        let user = users::Model {
            id: 0,
            username: input.username,
            password: input.password,
            email,
            phone,
            real_name: input.real_name,
            avatar: input.avatar,
            status,
            remark: input.remark,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            created_by: String::new(),
            updated_by: String::new(),
        };

        let created = self.users_repo.insert(user).await?;
        tracing::info!(user_id = created.id, username = %created.username, "user created");
        Ok(created)
    }

    async fn update_user(&self, input: UpdateUserInput) -> Result<users::Model, ApiError> {
        let id = input
            .id
            .ok_or_else(|| ApiError::validation("user id is required"))?;
        let mut existing = self
            .users_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("user not found"))?;

        if let Some(username) = normalize_optional(input.username) {
            validate_username(&username)?;
            if username != existing.username {
                self.ensure_username_available(&username).await?;
            }
            existing.username = username;
        }
        if let Some(password) = normalize_optional(input.password) {
            validate_password(&password)?;
            existing.password = password;
        }
        if let Some(email) = normalize_optional(input.email) {
            validate_email(&email)?;
            // self-match is not a conflict
            if existing.email.as_deref() != Some(email.as_str()) {
                self.ensure_email_available(&email).await?;
            }
            existing.email = Some(email);
        }
        if let Some(phone) = normalize_optional(input.phone) {
            validate_length("phone", &phone, 20)?;
            if existing.phone.as_deref() != Some(phone.as_str()) {
                self.ensure_phone_available(&phone).await?;
            }
            existing.phone = Some(phone);
        }
        if let Some(real_name) = input.real_name {
            validate_length("real_name", &real_name, 50)?;
            existing.real_name = Some(real_name);
        }
        if let Some(avatar) = input.avatar {
            validate_length("avatar", &avatar, 500)?;
            existing.avatar = Some(avatar);
        }
        if let Some(status) = input.status {
            validate_status(status)?;
            existing.status = status;
        }
        if let Some(remark) = input.remark {
            validate_length("remark", &remark, 500)?;
            existing.remark = Some(remark);
        }

        let updated = self.users_repo.update(existing).await?;
        tracing::info!(user_id = updated.id, "user updated");
        Ok(updated)
    }

    async fn get_user(&self, id: i64) -> Result<Option<users::Model>, ApiError> {
        Ok(self.users_repo.find_by_id(id).await?)
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<users::Model>, ApiError> {
        if is_blank(username) {
            return Ok(None);
        }
        Ok(self.users_repo.find_by_username(username).await?)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, ApiError> {
        if self.users_repo.find_by_id(id).await?.is_none() {
            return Err(ApiError::not_found("user not found"));
        }
        let deleted = self.users_repo.soft_delete_by_id(id).await?;
        if deleted {
            tracing::info!(user_id = id, "user deleted");
        }
        Ok(deleted)
    }

    async fn delete_users(&self, ids: &[i64]) -> Result<bool, ApiError> {
        if ids.is_empty() {
            return Err(ApiError::validation("user id list is required"));
        }
        let affected = self.users_repo.soft_delete_by_ids(ids).await?;
        tracing::info!(requested = ids.len(), affected, "users deleted");
        Ok(affected > 0)
    }

    async fn update_user_status(&self, id: i64, status: i16) -> Result<bool, ApiError> {
        validate_status(status)?;
        let mut existing = self
            .users_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        existing.status = status;
        self.users_repo.update(existing).await?;
        tracing::info!(user_id = id, status, "user status updated");
        Ok(true)
    }

    async fn reset_password(&self, id: i64, new_password: &str) -> Result<bool, ApiError> {
        if is_blank(new_password) {
            return Err(ApiError::validation("password must not be blank"));
        }
        let mut existing = self
            .users_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        // stored verbatim; hashing is the caller's concern on this path
        existing.password = new_password.to_string();
        self.users_repo.update(existing).await?;
        tracing::info!(user_id = id, "user password reset");
        Ok(true)
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, ApiError> {
        if is_blank(username) {
            return Ok(false);
        }
        Ok(self.users_repo.find_by_username(username).await?.is_some())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, ApiError> {
        if is_blank(email) {
            return Ok(false);
        }
        Ok(self.users_repo.find_by_email(email).await?.is_some())
    }

    async fn exists_by_phone(&self, phone: &str) -> Result<bool, ApiError> {
        if is_blank(phone) {
            return Ok(false);
        }
        Ok(self.users_repo.find_by_phone(phone).await?.is_some())
    }

    async fn get_user_page(
        &self,
        query: UserPageQuery,
    ) -> Result<(Vec<users::Model>, u64), ApiError> {
        let UserPageQuery {
            current,
            size,
            username,
            email,
            status,
        } = query;
        if current < 1 || size < 1 {
            return Err(ApiError::validation("current and size must be at least 1"));
        }
        let query = UserPageQuery {
            current,
            size,
            username: normalize_optional(username),
            email: normalize_optional(email),
            status,
        };
        Ok(self.users_repo.page(query).await?)
    }

    async fn get_user_statistics(&self) -> Result<UserStatistics, ApiError> {
        let total_users = self.users_repo.count_all().await?;
        let active_users = self
            .users_repo
            .count_by_status(users::STATUS_ACTIVE)
            .await?;
        let disabled_users = self
            .users_repo
            .count_by_status(users::STATUS_DISABLED)
            .await?;
        Ok(UserStatistics {
            total_users,
            active_users,
            disabled_users,
        })
    }
}
