use sqlx::PgPool;

use crate::auth::password;
use crate::config::AdminConfig;
use crate::db;
use crate::error::{AppError, FieldErrors};
use crate::models::User;
use crate::validate;

/// Create the configured superuser unless an account with that email exists.
/// Returns the new user, or `None` when nothing was created.
pub async fn ensure_superuser(pool: &PgPool, admin: &AdminConfig) -> Result<Option<User>, AppError> {
    let mut errors = FieldErrors::new();
    let email = validate::email(&mut errors, "email", &admin.email);
    password::check_length(&mut errors, "password", &admin.password);
    errors.into_result()?;

    if db::users::find_by_email(pool, &email).await?.is_some() {
        tracing::debug!("Superuser {email} already present");
        return Ok(None);
    }

    let pw_hash = password::hash(&admin.password).map_err(AppError::Internal)?;
    let user = db::users::create(pool, &email, &pw_hash, "", true).await?;
    tracing::info!("Created superuser {}", user.email);
    Ok(Some(user))
}
