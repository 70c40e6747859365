use crate::error::FieldErrors;

pub const MAX_TEXT_LENGTH: usize = 255;

/// Trimmed, non-blank, at most [`MAX_TEXT_LENGTH`] characters.
pub fn required_text(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "This field may not be blank.");
    } else {
        max_length(errors, field, trimmed);
    }
    trimmed.to_string()
}

pub fn max_length(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.chars().count() > MAX_TEXT_LENGTH {
        errors.add(
            field,
            format!("Ensure this field has no more than {MAX_TEXT_LENGTH} characters."),
        );
    }
}

/// Emails are identities, compared and stored in lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize and validate an email, recording problems under `field`.
pub fn email(errors: &mut FieldErrors, field: &str, raw: &str) -> String {
    let email = normalize_email(raw);
    if email.is_empty() {
        errors.add(field, "This field may not be blank.");
        return email;
    }
    if !looks_like_email(&email) {
        errors.add(field, "Enter a valid email address.");
    }
    max_length(errors, field, &email);
    email
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let labels: Vec<&str> = domain.split('.').collect();
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && labels.len() >= 2
        && labels.iter().all(|label| !label.is_empty())
}

/// Parse a comma separated id list such as `1,2,3`.
pub fn id_list(raw: &str) -> Result<Vec<i64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(|_| format!("Invalid id '{s}'")))
        .collect()
}
