use sea_orm::{Database, DatabaseConnection, DbErr};
use std::env;

/// Keeps credentials out of startup logs.
fn redact_db_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let (authority, path) = match rest.split_once('/') {
        Some((authority, path)) => (authority, Some(path)),
        None => (rest, None),
    };

    let authority = match authority.rsplit_once('@') {
        Some((credentials, hostport)) => {
            let user = credentials.split(':').next().unwrap_or(credentials);
            format!("{user}:***@{hostport}")
        }
        None => authority.to_string(),
    };

    match path {
        Some(path) => format!("{scheme}://{authority}/{path}"),
        None => format!("{scheme}://{authority}"),
    }
}

pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let url = env::var("DATABASE_URL")
        .map_err(|_| DbErr::Custom("DATABASE_URL is not set".to_string()))?;
    tracing::info!(url = %redact_db_url(&url), "connecting to database");

    Database::connect(url).await
}
