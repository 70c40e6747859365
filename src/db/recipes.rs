use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::Recipe;

/// Scalar columns written on create and update.
#[derive(Debug, Clone)]
pub struct RecipeFields {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
}

/// Relation filters for [`list`]. A recipe matches a filter when it holds any listed id.
#[derive(Debug, Default)]
pub struct ListFilter {
    pub tag_ids: Option<Vec<i64>>,
    pub ingredient_ids: Option<Vec<i64>>,
}

pub async fn list(
    pool: &PgPool,
    user_id: i64,
    filter: &ListFilter,
) -> Result<Vec<Recipe>, sqlx::Error> {
    sqlx::query_as::<_, Recipe>(
        "SELECT r.* FROM recipes r
         WHERE r.user_id = $1
           AND ($2::bigint[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
           AND ($3::bigint[] IS NULL OR EXISTS (
                SELECT 1 FROM recipe_ingredients ri
                WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
         ORDER BY r.id DESC",
    )
    .bind(user_id)
    .bind(filter.tag_ids.as_deref())
    .bind(filter.ingredient_ids.as_deref())
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    id: i64,
    user_id: i64,
) -> Result<Option<Recipe>, sqlx::Error> {
    sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    fields: &RecipeFields,
) -> Result<Recipe, sqlx::Error> {
    sqlx::query_as::<_, Recipe>(
        "INSERT INTO recipes (user_id, title, time_minutes, price, link)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(user_id)
    .bind(&fields.title)
    .bind(fields.time_minutes)
    .bind(fields.price)
    .bind(&fields.link)
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: i64,
    user_id: i64,
    fields: &RecipeFields,
) -> Result<Option<Recipe>, sqlx::Error> {
    sqlx::query_as::<_, Recipe>(
        "UPDATE recipes SET title = $3, time_minutes = $4, price = $5, link = $6
         WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(&fields.title)
    .bind(fields.time_minutes)
    .bind(fields.price)
    .bind(&fields.link)
    .fetch_optional(executor)
    .await
}

pub async fn set_image(
    pool: &PgPool,
    id: i64,
    user_id: i64,
    image: &str,
) -> Result<Option<Recipe>, sqlx::Error> {
    sqlx::query_as::<_, Recipe>(
        "UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(image)
    .fetch_optional(pool)
    .await
}

/// Delete and return the removed row, so the caller can clean up its image.
pub async fn delete(pool: &PgPool, id: i64, user_id: i64) -> Result<Option<Recipe>, sqlx::Error> {
    sqlx::query_as::<_, Recipe>("DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING *")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}
