//! Tag and ingredient endpoints. The two resources behave identically; the
//! public handlers below only pin the [`LabelKind`].

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::{AppError, FieldErrors, ValidJson, ValidPath};
use crate::models::{Label, LabelKind};
use crate::state::SharedState;
use crate::validate;

#[derive(Deserialize)]
pub struct ListParams {
    pub assigned_only: Option<String>,
}

#[derive(Deserialize)]
pub struct LabelRequest {
    #[serde(default)]
    pub name: Option<String>,
}

pub async fn list_tags(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Label>>, AppError> {
    list(LabelKind::Tag, &auth, &state, params).await
}

pub async fn create_tag(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<LabelRequest>,
) -> Result<(StatusCode, Json<Label>), AppError> {
    create(LabelKind::Tag, &auth, &state, req).await
}

pub async fn get_tag(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<Label>, AppError> {
    get(LabelKind::Tag, &auth, &state, id).await
}

pub async fn replace_tag(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<LabelRequest>,
) -> Result<Json<Label>, AppError> {
    update(LabelKind::Tag, &auth, &state, id, req, true).await
}

pub async fn update_tag(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<LabelRequest>,
) -> Result<Json<Label>, AppError> {
    update(LabelKind::Tag, &auth, &state, id, req, false).await
}

pub async fn delete_tag(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, AppError> {
    delete(LabelKind::Tag, &auth, &state, id).await
}

pub async fn list_ingredients(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Label>>, AppError> {
    list(LabelKind::Ingredient, &auth, &state, params).await
}

pub async fn create_ingredient(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<LabelRequest>,
) -> Result<(StatusCode, Json<Label>), AppError> {
    create(LabelKind::Ingredient, &auth, &state, req).await
}

pub async fn get_ingredient(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<Label>, AppError> {
    get(LabelKind::Ingredient, &auth, &state, id).await
}

pub async fn replace_ingredient(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<LabelRequest>,
) -> Result<Json<Label>, AppError> {
    update(LabelKind::Ingredient, &auth, &state, id, req, true).await
}

pub async fn update_ingredient(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<LabelRequest>,
) -> Result<Json<Label>, AppError> {
    update(LabelKind::Ingredient, &auth, &state, id, req, false).await
}

pub async fn delete_ingredient(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, AppError> {
    delete(LabelKind::Ingredient, &auth, &state, id).await
}

async fn list(
    kind: LabelKind,
    auth: &AuthUser,
    state: &SharedState,
    params: ListParams,
) -> Result<Json<Vec<Label>>, AppError> {
    let assigned_only = parse_flag(params.assigned_only.as_deref())?;
    let labels = db::labels::list(&state.pool, kind, auth.id(), assigned_only).await?;
    Ok(Json(labels))
}

async fn create(
    kind: LabelKind,
    auth: &AuthUser,
    state: &SharedState,
    req: LabelRequest,
) -> Result<(StatusCode, Json<Label>), AppError> {
    let mut errors = FieldErrors::new();
    let name = validate::required_text(&mut errors, "name", req.name.as_deref().unwrap_or(""));
    errors.into_result()?;

    let label = db::labels::create(&state.pool, kind, auth.id(), &name).await?;
    Ok((StatusCode::CREATED, Json(label)))
}

async fn get(
    kind: LabelKind,
    auth: &AuthUser,
    state: &SharedState,
    id: i64,
) -> Result<Json<Label>, AppError> {
    db::labels::find_by_id(&state.pool, kind, id, auth.id())
        .await?
        .map(Json)
        .ok_or_else(|| not_found(kind))
}

async fn update(
    kind: LabelKind,
    auth: &AuthUser,
    state: &SharedState,
    id: i64,
    req: LabelRequest,
    replace: bool,
) -> Result<Json<Label>, AppError> {
    let current = db::labels::find_by_id(&state.pool, kind, id, auth.id())
        .await?
        .ok_or_else(|| not_found(kind))?;

    let mut errors = FieldErrors::new();
    let name = match req.name.as_deref() {
        Some(raw) => validate::required_text(&mut errors, "name", raw),
        None if replace => {
            errors.add("name", "This field is required.");
            String::new()
        }
        None => current.name,
    };
    errors.into_result()?;

    db::labels::update(&state.pool, kind, id, auth.id(), &name)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(kind))
}

async fn delete(
    kind: LabelKind,
    auth: &AuthUser,
    state: &SharedState,
    id: i64,
) -> Result<StatusCode, AppError> {
    if db::labels::delete(&state.pool, kind, id, auth.id()).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(kind))
    }
}

fn not_found(kind: LabelKind) -> AppError {
    AppError::NotFound(format!("{} not found", kind.noun()))
}

/// `assigned_only` accepts `1`/`0` as well as `true`/`false`.
fn parse_flag(raw: Option<&str>) -> Result<bool, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(AppError::BadRequest(format!(
            "Invalid assigned_only value '{other}'"
        ))),
    }
}
