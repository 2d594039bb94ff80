use grantdesk_core::models::Notification;
use grantdesk_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str = "id, user_id, message, is_read, created_at";

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Queue a notification inside the caller's transaction, so the message
    /// only appears if the triggering mutation commits.
    pub async fn notify(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        message: &str,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO notifications (user_id, message) VALUES ($1, $2)")
            .bind(user_id)
            .bind(message)
            .execute(&mut **tx)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC",
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list notifications: {}", e);
            AppError::Internal("Failed to list notifications".to_string())
        })?;

        Ok(notifications)
    }

    /// Mark a notification read. The user_id predicate keeps users from
    /// touching each other's notifications. Returns false when no row
    /// matched.
    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
