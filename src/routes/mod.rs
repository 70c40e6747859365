pub mod labels;
pub mod recipes;
pub mod users;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::error::method_not_allowed;
use crate::state::SharedState;

pub fn api_routes(max_upload_size: usize) -> Router<SharedState> {
    Router::new()
        // Users
        .route("/user/create", post(users::register).fallback(method_not_allowed))
        .route("/user/token", post(users::token).fallback(method_not_allowed))
        .route("/user/logout", post(users::logout).fallback(method_not_allowed))
        .route(
            "/user/me",
            get(users::me)
                .put(users::replace_me)
                .patch(users::update_me)
                .fallback(method_not_allowed),
        )
        // Tags
        .route(
            "/recipe/tags",
            get(labels::list_tags)
                .post(labels::create_tag)
                .fallback(method_not_allowed),
        )
        .route(
            "/recipe/tags/{id}",
            get(labels::get_tag)
                .put(labels::replace_tag)
                .patch(labels::update_tag)
                .delete(labels::delete_tag)
                .fallback(method_not_allowed),
        )
        // Ingredients
        .route(
            "/recipe/ingredients",
            get(labels::list_ingredients)
                .post(labels::create_ingredient)
                .fallback(method_not_allowed),
        )
        .route(
            "/recipe/ingredients/{id}",
            get(labels::get_ingredient)
                .put(labels::replace_ingredient)
                .patch(labels::update_ingredient)
                .delete(labels::delete_ingredient)
                .fallback(method_not_allowed),
        )
        // Recipes
        .route(
            "/recipe/recipes",
            get(recipes::list)
                .post(recipes::create)
                .fallback(method_not_allowed),
        )
        .route(
            "/recipe/recipes/{id}",
            get(recipes::get)
                .put(recipes::replace)
                .patch(recipes::update)
                .delete(recipes::delete)
                .fallback(method_not_allowed),
        )
        .route(
            "/recipe/recipes/{id}/image",
            post(recipes::upload_image)
                .fallback(method_not_allowed)
                .layer(DefaultBodyLimit::max(max_upload_size)),
        )
}
