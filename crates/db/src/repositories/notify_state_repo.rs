//! Repository for the single-row `notify_state` table.

use sqlx::SqliteExecutor;

pub struct NotifyStateRepo;

impl NotifyStateRepo {
    /// Current value of the flag. A missing row reads as "not notified".
    pub async fn get<'e, E>(executor: E) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let notified = sqlx::query_scalar::<_, i64>("SELECT notified FROM notify_state WHERE id = 1")
            .fetch_optional(executor)
            .await?;
        Ok(notified.unwrap_or(0) != 0)
    }

    pub async fn set<'e, E>(executor: E, notified: bool) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO notify_state (id, notified) VALUES (1, ?) \
             ON CONFLICT (id) DO UPDATE SET notified = excluded.notified",
        )
        .bind(i64::from(notified))
        .execute(executor)
        .await?;
        Ok(())
    }
}
