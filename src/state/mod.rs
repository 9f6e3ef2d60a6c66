// Copyright 2023 Remi Bernotavicius

//! Front-end facing state. Each holder keeps what a screen shows, turns repository errors
//! into a message for the user, and leaves the rest of its state alone when something
//! fails.

use crate::error::Result;

mod ingredient_catalog;
mod recipe_browser;
mod recipe_form;

pub use ingredient_catalog::IngredientCatalog;
pub use recipe_browser::RecipeBrowser;
pub use recipe_form::RecipeForm;

fn report<T>(error_message: &mut Option<String>, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            log::warn!("{error}");
            *error_message = Some(error.to_string());
            None
        }
    }
}
