use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::recipes::{ListFilter, RecipeFields};
use crate::error::{self, AppError, FieldErrors, ValidJson, ValidPath};
use crate::media;
use crate::models::{Label, LabelKind, Recipe, RecipeLinks, RecipeView};
use crate::state::SharedState;
use crate::validate;

#[derive(Deserialize)]
pub struct ListParams {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

/// Body of create, PUT and PATCH. Absent fields stay `None`.
#[derive(Deserialize, Default)]
pub struct RecipeRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub time_minutes: Option<i64>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<i64>>,
    #[serde(default)]
    pub ingredients: Option<Vec<i64>>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<RecipeView>>, AppError> {
    let filter = ListFilter {
        tag_ids: parse_filter(params.tags.as_deref())?,
        ingredient_ids: parse_filter(params.ingredients.as_deref())?,
    };

    let recipes = db::recipes::list(&state.pool, auth.id(), &filter).await?;
    let mut links = load_links(&state, &recipes).await?;

    let views = recipes
        .into_iter()
        .map(|recipe| {
            let recipe_links = links.take(recipe.id);
            RecipeView::summary(recipe, recipe_links, &state.config.media_url)
        })
        .collect();
    Ok(Json(views))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<RecipeView>, AppError> {
    let recipe = find_owned(&state, &auth, id).await?;
    detail(&state, recipe).await.map(Json)
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<RecipeRequest>,
) -> Result<(StatusCode, Json<RecipeView>), AppError> {
    let mut errors = FieldErrors::new();
    let fields = resolve_fields(&mut errors, &req, None);
    let tags = req.tags.unwrap_or_default();
    let ingredients = req.ingredients.unwrap_or_default();
    check_relations(&state, &mut errors, LabelKind::Tag, &tags).await?;
    check_relations(&state, &mut errors, LabelKind::Ingredient, &ingredients).await?;
    errors.into_result()?;

    let mut tx = state.pool.begin().await?;
    let recipe = db::recipes::create(&mut *tx, auth.id(), &fields).await?;
    link_labels(&mut *tx, LabelKind::Tag, recipe.id, &tags).await?;
    link_labels(&mut *tx, LabelKind::Ingredient, recipe.id, &ingredients).await?;
    tx.commit().await?;

    tracing::info!("User {} created recipe {}", auth.id(), recipe.id);

    Ok((StatusCode::CREATED, Json(summary(&state, recipe).await?)))
}

/// PUT: every scalar is replaced and omitted relations are cleared.
pub async fn replace(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<RecipeRequest>,
) -> Result<Json<RecipeView>, AppError> {
    find_owned(&state, &auth, id).await?;

    let mut errors = FieldErrors::new();
    let fields = resolve_fields(&mut errors, &req, None);
    let tags = req.tags.unwrap_or_default();
    let ingredients = req.ingredients.unwrap_or_default();
    check_relations(&state, &mut errors, LabelKind::Tag, &tags).await?;
    check_relations(&state, &mut errors, LabelKind::Ingredient, &ingredients).await?;
    errors.into_result()?;

    save(&state, &auth, id, &fields, Some(tags.as_slice()), Some(ingredients.as_slice()))
        .await
        .map(Json)
}

/// PATCH: only supplied fields change; omitted relations are kept.
pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<RecipeRequest>,
) -> Result<Json<RecipeView>, AppError> {
    let current = find_owned(&state, &auth, id).await?;

    let mut errors = FieldErrors::new();
    let fields = resolve_fields(&mut errors, &req, Some(&current));
    if let Some(tags) = &req.tags {
        check_relations(&state, &mut errors, LabelKind::Tag, tags).await?;
    }
    if let Some(ingredients) = &req.ingredients {
        check_relations(&state, &mut errors, LabelKind::Ingredient, ingredients).await?;
    }
    errors.into_result()?;

    save(
        &state,
        &auth,
        id,
        &fields,
        req.tags.as_deref(),
        req.ingredients.as_deref(),
    )
    .await
    .map(Json)
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, AppError> {
    let removed = db::recipes::delete(&state.pool, id, auth.id())
        .await?
        .ok_or_else(recipe_not_found)?;

    if let Some(image) = removed.image.as_deref() {
        state.media.remove(image).await;
    }

    tracing::info!("User {} deleted recipe {id}", auth.id());
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_image(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RecipeView>, AppError> {
    let current = find_owned(&state, &auth, id).await?;

    let upload = media::read_file_field(&headers, body, "image")
        .await
        .map_err(AppError::BadRequest)?
        .ok_or_else(|| AppError::Validation(FieldErrors::single("image", "No file was submitted.")))?;

    let stored = state.media.save_recipe_image(upload.data).await?;
    let recipe = match db::recipes::set_image(&state.pool, id, auth.id(), &stored).await? {
        Some(recipe) => recipe,
        None => {
            state.media.remove(&stored).await;
            return Err(recipe_not_found());
        }
    };

    if let Some(previous) = current.image.as_deref() {
        state.media.remove(previous).await;
    }

    tracing::info!(
        "Stored image {stored} for recipe {id} (uploaded as {:?})",
        upload.file_name
    );

    detail(&state, recipe).await.map(Json)
}

async fn find_owned(state: &SharedState, auth: &AuthUser, id: i64) -> Result<Recipe, AppError> {
    db::recipes::find_by_id(&state.pool, id, auth.id())
        .await?
        .ok_or_else(recipe_not_found)
}

/// Replace one relation set. A label deleted since validation reads as a missing pk.
async fn link_labels(
    conn: &mut sqlx::PgConnection,
    kind: LabelKind,
    recipe_id: i64,
    ids: &[i64],
) -> Result<(), AppError> {
    db::labels::set_for_recipe(conn, kind, recipe_id, ids)
        .await
        .map_err(|err| error::relation_error(kind.field(), err))
}

fn recipe_not_found() -> AppError {
    AppError::NotFound("Recipe not found".to_string())
}

/// Write scalars, and each relation set that is `Some`, in one transaction.
async fn save(
    state: &SharedState,
    auth: &AuthUser,
    id: i64,
    fields: &RecipeFields,
    tags: Option<&[i64]>,
    ingredients: Option<&[i64]>,
) -> Result<RecipeView, AppError> {
    let mut tx = state.pool.begin().await?;
    let recipe = db::recipes::update(&mut *tx, id, auth.id(), fields)
        .await?
        .ok_or_else(recipe_not_found)?;
    if let Some(tags) = tags {
        link_labels(&mut *tx, LabelKind::Tag, id, tags).await?;
    }
    if let Some(ingredients) = ingredients {
        link_labels(&mut *tx, LabelKind::Ingredient, id, ingredients).await?;
    }
    tx.commit().await?;

    summary(state, recipe).await
}

/// Validate scalars. With `base`, missing fields fall back to its values; without, they are required.
fn resolve_fields(errors: &mut FieldErrors, req: &RecipeRequest, base: Option<&Recipe>) -> RecipeFields {
    let title = match (req.title.as_deref(), base) {
        (Some(raw), _) => validate::required_text(errors, "title", raw),
        (None, Some(base)) => base.title.clone(),
        (None, None) => {
            errors.add("title", "This field is required.");
            String::new()
        }
    };

    let time_minutes = match (req.time_minutes, base) {
        (Some(minutes), _) => match i32::try_from(minutes) {
            Ok(m) if m >= 0 => m,
            Ok(_) => {
                errors.add("time_minutes", "Ensure this value is greater than or equal to 0.");
                0
            }
            Err(_) => {
                errors.add("time_minutes", "Ensure this value is less than or equal to 2147483647.");
                0
            }
        },
        (None, Some(base)) => base.time_minutes,
        (None, None) => {
            errors.add("time_minutes", "This field is required.");
            0
        }
    };

    let price = match (req.price, base) {
        (Some(price), _) => {
            check_price(errors, price);
            price.round_dp(2)
        }
        (None, Some(base)) => base.price,
        (None, None) => {
            errors.add("price", "This field is required.");
            Decimal::ZERO
        }
    };

    let link = match (req.link.as_deref(), base) {
        (Some(raw), _) => {
            let link = raw.trim().to_string();
            validate::max_length(errors, "link", &link);
            link
        }
        (None, Some(base)) => base.link.clone(),
        (None, None) => String::new(),
    };

    RecipeFields {
        title,
        time_minutes,
        price,
        link,
    }
}

/// Prices fit NUMERIC(5, 2).
fn check_price(errors: &mut FieldErrors, price: Decimal) {
    let normalized = price.normalize();
    if normalized.scale() > 2 {
        errors.add("price", "Ensure that there are no more than 2 decimal places.");
    }
    if normalized.abs().trunc() >= Decimal::from(1000) {
        errors.add(
            "price",
            "Ensure that there are no more than 3 digits before the decimal point.",
        );
    }
}

async fn check_relations(
    state: &SharedState,
    errors: &mut FieldErrors,
    kind: LabelKind,
    ids: &[i64],
) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }
    let existing = db::labels::existing_ids(&state.pool, kind, ids).await?;
    for id in ids {
        if !existing.contains(id) {
            errors.add(
                kind.field(),
                format!("Invalid pk \"{id}\" - object does not exist."),
            );
        }
    }
    Ok(())
}

fn parse_filter(raw: Option<&str>) -> Result<Option<Vec<i64>>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let ids = validate::id_list(raw).map_err(AppError::BadRequest)?;
    Ok(if ids.is_empty() { None } else { Some(ids) })
}

/// Relations for a batch of recipes, fetched with one query per kind.
struct LinkSet {
    tags: HashMap<i64, Vec<Label>>,
    ingredients: HashMap<i64, Vec<Label>>,
}

impl LinkSet {
    fn take(&mut self, recipe_id: i64) -> RecipeLinks {
        RecipeLinks {
            tags: self.tags.remove(&recipe_id).unwrap_or_default(),
            ingredients: self.ingredients.remove(&recipe_id).unwrap_or_default(),
        }
    }
}

async fn load_links(state: &SharedState, recipes: &[Recipe]) -> Result<LinkSet, AppError> {
    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
    if ids.is_empty() {
        return Ok(LinkSet {
            tags: HashMap::new(),
            ingredients: HashMap::new(),
        });
    }
    Ok(LinkSet {
        tags: db::labels::for_recipes(&state.pool, LabelKind::Tag, &ids).await?,
        ingredients: db::labels::for_recipes(&state.pool, LabelKind::Ingredient, &ids).await?,
    })
}

async fn summary(state: &SharedState, recipe: Recipe) -> Result<RecipeView, AppError> {
    let links = load_links(state, std::slice::from_ref(&recipe)).await?.take(recipe.id);
    Ok(RecipeView::summary(recipe, links, &state.config.media_url))
}

async fn detail(state: &SharedState, recipe: Recipe) -> Result<RecipeView, AppError> {
    let links = load_links(state, std::slice::from_ref(&recipe)).await?.take(recipe.id);
    Ok(RecipeView::detail(recipe, links, &state.config.media_url))
}
