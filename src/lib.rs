// Copyright 2023 Remi Bernotavicius

//! Offline recipe management for homebrewers: recipes, the ingredient catalog, and the rows
//! that join them, kept in a local SQLite database.

pub mod database;
pub mod error;
pub mod repository;
pub mod seed;
pub mod state;

pub use database::models::{
    BeverageType, Ingredient, IngredientCategory, IngredientId, IngredientIdList, NewIngredient,
    NewRecipe, NewRecipeIngredient, Recipe, RecipeId, RecipeIngredient, RecipeIngredientId,
};
pub use database::Database;
pub use error::{RepositoryError, Result};
