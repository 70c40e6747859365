mod label;
mod recipe;
mod user;

pub use label::{Label, LabelKind};
pub use recipe::{Recipe, RecipeDetail, RecipeLinks, RecipeSummary, RecipeView};
pub use user::User;
