use sqlx::PgPool;

use crate::models::User;

pub async fn create(pool: &PgPool, user_id: i64, token_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO auth_tokens (user_id, token_hash) VALUES ($1, $2)")
        .bind(user_id)
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Resolve the user a token digest was issued to.
pub async fn find_user_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT u.* FROM auth_tokens t
         JOIN users u ON t.user_id = u.id
         WHERE t.token_hash = $1",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

pub async fn delete_by_hash(pool: &PgPool, token_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM auth_tokens WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}
