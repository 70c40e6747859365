use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::auth::{password, token};
use crate::db;
use crate::error::{AppError, FieldErrors, ValidJson};
use crate::models::User;
use crate::state::SharedState;
use crate::validate;

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct CreatedUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct Profile {
    pub email: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Profile {
            email: user.email,
            name: user.name,
        }
    }
}

pub async fn register(
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<CreatedUser>), AppError> {
    let mut errors = FieldErrors::new();
    let email = validate::email(&mut errors, "email", req.email.as_deref().unwrap_or(""));
    let pw = req.password.unwrap_or_default();
    password::check_length(&mut errors, "password", &pw);
    let name = req.name.unwrap_or_default().trim().to_string();
    validate::max_length(&mut errors, "name", &name);

    if !errors.contains("email") && db::users::find_by_email(&state.pool, &email).await?.is_some() {
        errors.add("email", "user with this email already exists.");
    }
    errors.into_result()?;

    let pw_hash = password::hash(&pw).map_err(AppError::Internal)?;
    let user = db::users::create(&state.pool, &email, &pw_hash, &name, false)
        .await
        .map_err(duplicate_email)?;

    tracing::info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(CreatedUser {
            id: user.id,
            email: user.email,
            name: user.name,
        }),
    ))
}

pub async fn token(
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let email = validate::normalize_email(req.email.as_deref().unwrap_or(""));
    let pw = req.password.unwrap_or_default();

    let mut errors = FieldErrors::new();
    if email.is_empty() {
        errors.add("email", "This field may not be blank.");
    }
    if pw.is_empty() {
        errors.add("password", "This field may not be blank.");
    }
    errors.into_result()?;

    let invalid = || {
        AppError::Validation(FieldErrors::single(
            "non_field_errors",
            "Unable to authenticate with provided credentials",
        ))
    };

    let user = db::users::find_by_email(&state.pool, &email)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(invalid)?;

    if !password::verify(&pw, &user.password_hash).map_err(AppError::Internal)? {
        return Err(invalid());
    }

    let issued = token::generate();
    db::auth_tokens::create(&state.pool, user.id, &token::digest(&issued)).await?;

    tracing::info!("Issued token for user {}", user.id);

    Ok(Json(TokenResponse { token: issued }))
}

pub async fn logout(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<StatusCode, AppError> {
    db::auth_tokens::delete_by_hash(&state.pool, &auth.token_hash).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(auth: AuthUser) -> Json<Profile> {
    Json(auth.user.into())
}

/// PATCH: only the supplied fields change.
pub async fn update_me(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<ProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    save_profile(&state, auth.user, req, false).await
}

/// PUT: email and password must be supplied.
pub async fn replace_me(
    auth: AuthUser,
    State(state): State<SharedState>,
    ValidJson(req): ValidJson<ProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    save_profile(&state, auth.user, req, true).await
}

async fn save_profile(
    state: &SharedState,
    user: User,
    req: ProfileRequest,
    replace: bool,
) -> Result<Json<Profile>, AppError> {
    let mut errors = FieldErrors::new();

    if replace {
        if req.email.is_none() {
            errors.add("email", "This field is required.");
        }
        if req.password.is_none() {
            errors.add("password", "This field is required.");
        }
    }

    let email = match req.email.as_deref() {
        Some(raw) => validate::email(&mut errors, "email", raw),
        None => user.email.clone(),
    };
    if let Some(pw) = req.password.as_deref() {
        password::check_length(&mut errors, "password", pw);
    }
    let name = match req.name {
        Some(name) => name.trim().to_string(),
        None if replace => String::new(),
        None => user.name.clone(),
    };
    validate::max_length(&mut errors, "name", &name);

    if !errors.contains("email")
        && email != user.email
        && db::users::find_by_email(&state.pool, &email).await?.is_some()
    {
        errors.add("email", "user with this email already exists.");
    }
    errors.into_result()?;

    let pw_hash = req
        .password
        .as_deref()
        .map(password::hash)
        .transpose()
        .map_err(AppError::Internal)?;

    let updated = db::users::update_profile(&state.pool, user.id, &email, &name, pw_hash.as_deref())
        .await
        .map_err(duplicate_email)?;

    Ok(Json(updated.into()))
}

/// Unique violations on `users.email` surface as a field error.
fn duplicate_email(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => AppError::Validation(
            FieldErrors::single("email", "user with this email already exists."),
        ),
        other => AppError::Database(other),
    }
}
