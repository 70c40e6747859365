use rust_decimal::Decimal;
use serde::Serialize;

use super::Label;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
}

/// Tags and ingredients attached to one recipe, each ordered by id.
#[derive(Debug, Clone, Default)]
pub struct RecipeLinks {
    pub tags: Vec<Label>,
    pub ingredients: Vec<Label>,
}

#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub tags: Vec<Label>,
    pub ingredients: Vec<Label>,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
}

/// Response shape picked by the handler: list-style ids or nested relations.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RecipeView {
    Summary(RecipeSummary),
    Detail(RecipeDetail),
}

impl RecipeView {
    pub fn summary(recipe: Recipe, links: RecipeLinks, media_url: &str) -> Self {
        RecipeView::Summary(RecipeSummary {
            id: recipe.id,
            image: image_url(recipe.image.as_deref(), media_url),
            title: recipe.title,
            tags: links.tags.iter().map(|t| t.id).collect(),
            ingredients: links.ingredients.iter().map(|i| i.id).collect(),
            time_minutes: recipe.time_minutes,
            price: with_cents(recipe.price),
            link: recipe.link,
        })
    }

    pub fn detail(recipe: Recipe, links: RecipeLinks, media_url: &str) -> Self {
        RecipeView::Detail(RecipeDetail {
            id: recipe.id,
            image: image_url(recipe.image.as_deref(), media_url),
            title: recipe.title,
            tags: links.tags,
            ingredients: links.ingredients,
            time_minutes: recipe.time_minutes,
            price: with_cents(recipe.price),
            link: recipe.link,
        })
    }
}

fn image_url(path: Option<&str>, media_url: &str) -> Option<String> {
    path.map(|p| format!("{media_url}/{p}"))
}

fn with_cents(mut price: Decimal) -> Decimal {
    price.rescale(2);
    price
}
