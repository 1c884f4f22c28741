pub mod summary;
pub mod user_settings;

use std::sync::Arc;

use crate::db_core::prelude::*;

pub use summary::{EmailSummaryCtrl, NewSummary, StoredSummary, SummaryStore};
pub use user_settings::{Preferences, SettingsRecord, UserSettingsCtrl, UserSettingsStore};

/// Both stores share one connection pool.
pub fn stores(conn: DatabaseConnection) -> (Arc<dyn SummaryStore>, Arc<dyn UserSettingsStore>) {
    let conn = Arc::new(conn);
    (conn.clone(), conn)
}

/// Creates the tables and their indexes when they do not exist yet.
pub async fn ensure_schema(conn: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    let tables = [
        schema
            .create_table_from_entity(EmailSummary)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(UserSettings)
            .if_not_exists()
            .to_owned(),
    ];
    for table in tables {
        conn.execute(backend.build(&table)).await?;
    }

    for mut index in schema.create_index_from_entity(EmailSummary) {
        index.if_not_exists();
        conn.execute(backend.build(&index)).await?;
    }

    tracing::info!("Database schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;

    #[tokio::test]
    async fn test_ensure_schema_creates_tables() {
        let ok = || MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        };
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([ok(), ok(), ok()])
            .into_connection();

        ensure_schema(&conn).await.unwrap();

        let log = format!("{:?}", conn.into_transaction_log());
        assert_eq!(log.matches("CREATE TABLE IF NOT EXISTS").count(), 2);
        assert!(log.contains("email_summary"));
        assert!(log.contains("user_settings"));
    }

    #[tokio::test]
    async fn test_stores_share_one_connection() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<entity::user_settings::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            .into_connection();

        let (summaries, settings) = stores(conn);

        assert_eq!(summaries.delete_by_user("user-1").await.unwrap(), 3);
        assert!(settings.get("user-1").await.unwrap().is_none());
    }
}
