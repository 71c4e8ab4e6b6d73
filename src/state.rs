use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::{
    repo::users::UsersRepo,
    service::{config::ConfigService, users::UsersService},
};

pub trait DatabaseClient: Send + Sync {
    fn conn(&self) -> &DatabaseConnection;
}

pub struct SeaOrmDatabaseClient {
    conn: DatabaseConnection,
}

impl SeaOrmDatabaseClient {
    pub async fn new() -> Self {
        let conn = crate::db::connect()
            .await
            .expect("database connection failed");
        crate::schema::apply(&conn)
            .await
            .expect("schema apply failed");
        Self { conn }
    }
}

impl DatabaseClient for SeaOrmDatabaseClient {
    fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}

pub struct AppState {
    db: Arc<dyn DatabaseClient>,
    users: Arc<dyn UsersService>,
    config: Arc<dyn ConfigService>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let db = Arc::new(SeaOrmDatabaseClient::new().await);
        let users_repo = Arc::new(crate::repo::users::SeaOrmUsersRepo::new(db.clone()));
        Self::assemble(db, users_repo)
    }

    pub(crate) fn assemble(
        db: Arc<dyn DatabaseClient>,
        users_repo: Arc<dyn UsersRepo>,
    ) -> Arc<Self> {
        let users = Arc::new(crate::service::users::UsersServiceImpl::new(users_repo));
        let config = Arc::new(crate::service::config::ConfigServiceImpl::new());

        Arc::new(Self { db, users, config })
    }

    pub fn db(&self) -> &dyn DatabaseClient {
        self.db.as_ref()
    }

    pub fn users(&self) -> &dyn UsersService {
        self.users.as_ref()
    }

    pub fn config(&self) -> &dyn ConfigService {
        self.config.as_ref()
    }
}
