pub mod auth_tokens;
pub mod labels;
pub mod recipes;
pub mod users;
