use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    prelude::DateTimeWithTimeZone,
    sea_query::Expr,
    ActiveModelTrait,
    ActiveValue::{NotSet, Set, Unchanged},
    ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::{entities::users, state::DatabaseClient};

// TODO: take the actor from the authenticated caller once an identity layer
// exists.
pub const SYSTEM_ACTOR: &str = "system";

pub struct UserPageQuery {
    pub current: u64,
    pub size: u64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub status: Option<i16>,
}

/// Persistence boundary for the users table. Reads never see soft-deleted
/// rows; mutations stamp the audit columns as a side effect.
#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn insert(&self, user: users::Model) -> Result<users::Model, DbErr>;
    async fn update(&self, user: users::Model) -> Result<users::Model, DbErr>;
    async fn find_by_id(&self, id: i64) -> Result<Option<users::Model>, DbErr>;
    async fn find_by_username(&self, username: &str) -> Result<Option<users::Model>, DbErr>;
    async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr>;
    async fn find_by_phone(&self, phone: &str) -> Result<Option<users::Model>, DbErr>;
    #[allow(dead_code)]
    async fn find_active(&self) -> Result<Vec<users::Model>, DbErr>;
    async fn count_all(&self) -> Result<u64, DbErr>;
    async fn count_by_status(&self, status: i16) -> Result<u64, DbErr>;
    async fn page(&self, query: UserPageQuery) -> Result<(Vec<users::Model>, u64), DbErr>;
    async fn soft_delete_by_id(&self, id: i64) -> Result<bool, DbErr>;
    async fn soft_delete_by_ids(&self, ids: &[i64]) -> Result<u64, DbErr>;
}

pub struct SeaOrmUsersRepo {
    db: std::sync::Arc<dyn DatabaseClient>,
}

impl SeaOrmUsersRepo {
    pub fn new(db: std::sync::Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsersRepo for SeaOrmUsersRepo {
    async fn insert(&self, user: users::Model) -> Result<users::Model, DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let model = users::ActiveModel {
            id: NotSet,
            username: Set(user.username),
            password: Set(user.password),
            email: Set(user.email),
            phone: Set(user.phone),
            real_name: Set(user.real_name),
            avatar: Set(user.avatar),
            status: Set(user.status),
            remark: Set(user.remark),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            created_by: Set(SYSTEM_ACTOR.to_string()),
            updated_by: Set(SYSTEM_ACTOR.to_string()),
        };
        model.insert(self.db.conn()).await
    }

    async fn update(&self, user: users::Model) -> Result<users::Model, DbErr> {
        // created_at/created_by/deleted_at stay untouched on update.
        let model = users::ActiveModel {
            id: Unchanged(user.id),
            username: Set(user.username),
            password: Set(user.password),
            email: Set(user.email),
            phone: Set(user.phone),
            real_name: Set(user.real_name),
            avatar: Set(user.avatar),
            status: Set(user.status),
            remark: Set(user.remark),
            created_at: NotSet,
            updated_at: Set(Utc::now().into()),
            deleted_at: NotSet,
            created_by: NotSet,
            updated_by: Set(SYSTEM_ACTOR.to_string()),
        };
        model.update(self.db.conn()).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id)
            .filter(users::Column::DeletedAt.is_null())
            .one(self.db.conn())
            .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .filter(users::Column::DeletedAt.is_null())
            .one(self.db.conn())
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::DeletedAt.is_null())
            .one(self.db.conn())
            .await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Phone.eq(phone))
            .filter(users::Column::DeletedAt.is_null())
            .one(self.db.conn())
            .await
    }

    async fn find_active(&self) -> Result<Vec<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Status.eq(users::STATUS_ACTIVE))
            .filter(users::Column::DeletedAt.is_null())
            .order_by_desc(users::Column::CreatedAt)
            .all(self.db.conn())
            .await
    }

    async fn count_all(&self) -> Result<u64, DbErr> {
        users::Entity::find()
            .filter(users::Column::DeletedAt.is_null())
            .count(self.db.conn())
            .await
    }

    async fn count_by_status(&self, status: i16) -> Result<u64, DbErr> {
        users::Entity::find()
            .filter(users::Column::Status.eq(status))
            .filter(users::Column::DeletedAt.is_null())
            .count(self.db.conn())
            .await
    }

    async fn page(&self, query: UserPageQuery) -> Result<(Vec<users::Model>, u64), DbErr> {
        let mut select = users::Entity::find().filter(users::Column::DeletedAt.is_null());
        if let Some(username) = &query.username {
            select = select.filter(users::Column::Username.contains(username.as_str()));
        }
        if let Some(email) = &query.email {
            select = select.filter(users::Column::Email.contains(email.as_str()));
        }
        if let Some(status) = query.status {
            select = select.filter(users::Column::Status.eq(status));
        }

        let paginator = select
            .order_by_desc(users::Column::CreatedAt)
            .paginate(self.db.conn(), query.size);
        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(query.current.saturating_sub(1)).await?;
        Ok((records, total))
    }

    async fn soft_delete_by_id(&self, id: i64) -> Result<bool, DbErr> {
        let affected = self.soft_delete_by_ids(&[id]).await?;
        Ok(affected > 0)
    }

    async fn soft_delete_by_ids(&self, ids: &[i64]) -> Result<u64, DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = users::Entity::update_many()
            .col_expr(users::Column::DeletedAt, Expr::value(now))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .col_expr(users::Column::UpdatedBy, Expr::value(SYSTEM_ACTOR))
            .filter(users::Column::Id.is_in(ids.iter().copied()))
            .filter(users::Column::DeletedAt.is_null())
            .exec(self.db.conn())
            .await?;
        Ok(result.rows_affected)
    }
}

/// In-memory store backing the service and handler tests.
#[cfg(test)]
pub struct InMemoryUsersRepo {
    rows: tokio::sync::RwLock<Vec<users::Model>>,
    next_id: std::sync::atomic::AtomicI64,
}

#[cfg(test)]
impl InMemoryUsersRepo {
    pub fn new() -> Self {
        Self {
            rows: tokio::sync::RwLock::new(Vec::new()),
            next_id: std::sync::atomic::AtomicI64::new(1),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl UsersRepo for InMemoryUsersRepo {
    async fn insert(&self, user: users::Model) -> Result<users::Model, DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut stored = user;
        stored.id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        stored.created_at = now;
        stored.updated_at = now;
        stored.deleted_at = None;
        stored.created_by = SYSTEM_ACTOR.to_string();
        stored.updated_by = SYSTEM_ACTOR.to_string();
        self.rows.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, user: users::Model) -> Result<users::Model, DbErr> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == user.id && row.deleted_at.is_none())
            .ok_or(DbErr::RecordNotUpdated)?;
        row.username = user.username;
        row.password = user.password;
        row.email = user.email;
        row.phone = user.phone;
        row.real_name = user.real_name;
        row.avatar = user.avatar;
        row.status = user.status;
        row.remark = user.remark;
        row.updated_at = Utc::now().into();
        row.updated_by = SYSTEM_ACTOR.to_string();
        Ok(row.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<users::Model>, DbErr> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|row| row.id == id && row.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<users::Model>, DbErr> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|row| row.username == username && row.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|row| row.email.as_deref() == Some(email) && row.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<users::Model>, DbErr> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|row| row.phone.as_deref() == Some(phone) && row.deleted_at.is_none())
            .cloned())
    }

    async fn find_active(&self) -> Result<Vec<users::Model>, DbErr> {
        let rows = self.rows.read().await;
        let mut active: Vec<users::Model> = rows
            .iter()
            .filter(|row| row.status == users::STATUS_ACTIVE && row.deleted_at.is_none())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn count_all(&self) -> Result<u64, DbErr> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|row| row.deleted_at.is_none()).count() as u64)
    }

    async fn count_by_status(&self, status: i16) -> Result<u64, DbErr> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| row.status == status && row.deleted_at.is_none())
            .count() as u64)
    }

    async fn page(&self, query: UserPageQuery) -> Result<(Vec<users::Model>, u64), DbErr> {
        let rows = self.rows.read().await;
        let mut matched: Vec<users::Model> = rows
            .iter()
            .filter(|row| row.deleted_at.is_none())
            .filter(|row| {
                query
                    .username
                    .as_deref()
                    .map_or(true, |needle| row.username.contains(needle))
            })
            .filter(|row| {
                query.email.as_deref().map_or(true, |needle| {
                    row.email.as_deref().is_some_and(|email| email.contains(needle))
                })
            })
            .filter(|row| query.status.map_or(true, |status| row.status == status))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len() as u64;
        let offset = (query.current.saturating_sub(1) * query.size) as usize;
        let records = matched
            .into_iter()
            .skip(offset)
            .take(query.size as usize)
            .collect();
        Ok((records, total))
    }

    async fn soft_delete_by_id(&self, id: i64) -> Result<bool, DbErr> {
        let affected = self.soft_delete_by_ids(&[id]).await?;
        Ok(affected > 0)
    }

    async fn soft_delete_by_ids(&self, ids: &[i64]) -> Result<u64, DbErr> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut rows = self.rows.write().await;
        let mut affected = 0;
        for row in rows.iter_mut() {
            if ids.contains(&row.id) && row.deleted_at.is_none() {
                row.deleted_at = Some(now);
                row.updated_at = now;
                row.updated_by = SYSTEM_ACTOR.to_string();
                affected += 1;
            }
        }
        Ok(affected)
    }
}
