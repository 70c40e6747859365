//! Tag and ingredient storage. Both live in identically shaped tables, so
//! every query takes a [`LabelKind`] that supplies the table names.

use std::collections::HashMap;

use sqlx::PgPool;

use crate::models::{Label, LabelKind};

/// Labels owned by `user_id`, newest name first (`name DESC`).
pub async fn list(
    pool: &PgPool,
    kind: LabelKind,
    user_id: i64,
    assigned_only: bool,
) -> Result<Vec<Label>, sqlx::Error> {
    let assigned = if assigned_only {
        format!(
            "AND EXISTS (SELECT 1 FROM {link} rl WHERE rl.{col} = l.id)",
            link = kind.link_table(),
            col = kind.link_column(),
        )
    } else {
        String::new()
    };

    sqlx::query_as::<_, Label>(&format!(
        "SELECT l.id, l.name, l.user_id FROM {table} l
         WHERE l.user_id = $1 {assigned}
         ORDER BY l.name DESC, l.id DESC",
        table = kind.table(),
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    kind: LabelKind,
    user_id: i64,
    name: &str,
) -> Result<Label, sqlx::Error> {
    sqlx::query_as::<_, Label>(&format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, name, user_id",
        kind.table()
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    kind: LabelKind,
    id: i64,
    user_id: i64,
) -> Result<Option<Label>, sqlx::Error> {
    sqlx::query_as::<_, Label>(&format!(
        "SELECT id, name, user_id FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    kind: LabelKind,
    id: i64,
    user_id: i64,
    name: &str,
) -> Result<Option<Label>, sqlx::Error> {
    sqlx::query_as::<_, Label>(&format!(
        "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, name, user_id",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// Returns whether a row was removed.
pub async fn delete(
    pool: &PgPool,
    kind: LabelKind,
    id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// The subset of `ids` that exist, regardless of owner.
pub async fn existing_ids<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    kind: LabelKind,
    ids: &[i64],
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT id FROM {} WHERE id = ANY($1)",
        kind.table()
    ))
    .bind(ids)
    .fetch_all(executor)
    .await
}

#[derive(sqlx::FromRow)]
struct LinkedLabel {
    recipe_id: i64,
    id: i64,
    name: String,
    user_id: i64,
}

/// Labels attached to each of `recipe_ids`, ordered by label id.
pub async fn for_recipes(
    pool: &PgPool,
    kind: LabelKind,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<Label>>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LinkedLabel>(&format!(
        "SELECT rl.recipe_id, l.id, l.name, l.user_id FROM {link} rl
         JOIN {table} l ON rl.{col} = l.id
         WHERE rl.recipe_id = ANY($1)
         ORDER BY l.id",
        link = kind.link_table(),
        table = kind.table(),
        col = kind.link_column(),
    ))
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<i64, Vec<Label>> = HashMap::new();
    for row in rows {
        grouped.entry(row.recipe_id).or_default().push(Label {
            id: row.id,
            name: row.name,
            user_id: row.user_id,
        });
    }
    Ok(grouped)
}

/// Replace the recipe's links of this kind with exactly `ids`.
pub async fn set_for_recipe(
    conn: &mut sqlx::PgConnection,
    kind: LabelKind,
    recipe_id: i64,
    ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1",
        kind.link_table()
    ))
    .bind(recipe_id)
    .execute(&mut *conn)
    .await?;

    if ids.is_empty() {
        return Ok(());
    }

    sqlx::query(&format!(
        "INSERT INTO {link} (recipe_id, {col})
         SELECT $1, unnest($2::bigint[])
         ON CONFLICT DO NOTHING",
        link = kind.link_table(),
        col = kind.link_column(),
    ))
    .bind(recipe_id)
    .bind(ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
