use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use sea_orm_migration::prelude::*;

mod users;

pub async fn apply(conn: &DatabaseConnection) -> Result<(), DbErr> {
    let manager = SchemaManager::new(conn);

    users::apply(&manager, conn).await?;
    apply_audit_invariants(conn).await?;

    Ok(())
}

/// Storage-level backstop for the update audit stamp: the application sets
/// `updated_at` on every mutation, the trigger covers writes that bypass it.
async fn apply_audit_invariants(conn: &DatabaseConnection) -> Result<(), DbErr> {
    conn.execute(Statement::from_string(
        DbBackend::Postgres,
        r#"
CREATE OR REPLACE FUNCTION set_updated_at()
RETURNS trigger AS $$
BEGIN
  NEW.updated_at = now();
  RETURN NEW;
END;
$$ LANGUAGE plpgsql;
"#
        .to_string(),
    ))
    .await?;

    conn.execute(Statement::from_string(
        DbBackend::Postgres,
        r#"
DO $$
BEGIN
  IF NOT EXISTS (
    SELECT 1
    FROM pg_trigger
    WHERE tgname = 'trg_users_set_updated_at'
      AND tgrelid = 'users'::regclass
  ) THEN
    EXECUTE 'CREATE TRIGGER trg_users_set_updated_at
             BEFORE UPDATE ON users
             FOR EACH ROW
             EXECUTE FUNCTION set_updated_at()';
  END IF;
END $$;
"#
        .to_string(),
    ))
    .await?;

    Ok(())
}
