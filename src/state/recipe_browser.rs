// Copyright 2023 Remi Bernotavicius

use super::report;
use crate::database::models::{Recipe, RecipeId};
use crate::database::watch::LiveQuery;
use crate::database::Database;
use crate::repository::RecipeQuery;

pub struct RecipeBrowser {
    recipes: LiveQuery<RecipeQuery>,
    pub error_message: Option<String>,
}

impl RecipeBrowser {
    pub fn new(db: &mut Database) -> Self {
        let mut browser = Self {
            recipes: db.watch(RecipeQuery::All),
            error_message: None,
        };
        browser.refresh(db);
        browser
    }

    pub fn recipes(&self) -> &[Recipe] {
        self.recipes.snapshot()
    }

    pub fn filter(&self) -> &RecipeQuery {
        self.recipes.query()
    }

    pub fn set_filter(&mut self, db: &mut Database, filter: RecipeQuery) {
        self.recipes.set_query(filter);
        self.refresh(db);
    }

    /// Blank text goes back to the full list.
    pub fn search(&mut self, db: &mut Database, text: &str) {
        let filter = if text.trim().is_empty() {
            RecipeQuery::All
        } else {
            RecipeQuery::Search(text.trim().into())
        };
        self.set_filter(db, filter);
    }

    /// Picks up committed writes. Returns true when the list changed.
    pub fn refresh(&mut self, db: &mut Database) -> bool {
        let result = self.recipes.refresh(db);
        report(&mut self.error_message, result).unwrap_or(false)
    }

    pub fn toggle_favorite(&mut self, db: &mut Database, id: RecipeId) -> Option<bool> {
        let result = db.recipes().toggle_favorite(id);
        let favorite = report(&mut self.error_message, result)?;
        self.refresh(db);
        Some(favorite)
    }

    pub fn delete(&mut self, db: &mut Database, id: RecipeId) {
        let result = db.recipes().soft_delete(id);
        if report(&mut self.error_message, result).is_some() {
            self.refresh(db);
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error_message = None;
    }
}
