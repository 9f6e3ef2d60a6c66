// Copyright 2023 Remi Bernotavicius

use super::report;
use crate::database::models::{BeverageType, Ingredient, NewRecipe, Recipe, RecipeId};
use crate::database::Database;
use crate::error::{RepositoryError, Result};
use crate::repository::RecipeIngredientEdit;

/// The create and edit screen for one recipe. Text fields hold exactly what the user typed,
/// so a failed save can be retried without losing anything.
pub struct RecipeForm {
    stored: Option<Recipe>,
    pub name: String,
    pub description: String,
    pub beverage_type: BeverageType,
    pub batch_size: String,
    pub batch_unit: String,
    pub difficulty: i32,
    pub instructions: String,
    pub notes: String,
    pub ingredients: Vec<RecipeIngredientEdit>,
    pub error_message: Option<String>,
}

impl RecipeForm {
    pub fn new_recipe(beverage_type: BeverageType) -> Self {
        let defaults = NewRecipe::new("", beverage_type, 0.0);
        Self {
            stored: None,
            name: String::new(),
            description: String::new(),
            beverage_type,
            batch_size: String::new(),
            batch_unit: defaults.batch_unit,
            difficulty: defaults.difficulty,
            instructions: String::new(),
            notes: String::new(),
            ingredients: vec![],
            error_message: None,
        }
    }

    /// Opens a stored recipe for editing. A missing recipe leaves an error message on a
    /// blank form.
    pub fn edit(db: &mut Database, id: RecipeId) -> Self {
        let mut form = Self::new_recipe(BeverageType::Beer);
        let result = Self::load(db, id);
        if let Some((recipe, ingredients)) = report(&mut form.error_message, result) {
            form.fill(recipe, ingredients);
        }
        form
    }

    fn load(db: &mut Database, id: RecipeId) -> Result<(Recipe, Vec<RecipeIngredientEdit>)> {
        let recipe = db
            .recipes()
            .get(id)?
            .ok_or(RepositoryError::recipe_not_found(id))?;
        let ingredients = db
            .recipe_ingredients()
            .rows(id)?
            .iter()
            .map(RecipeIngredientEdit::from_row)
            .collect();
        Ok((recipe, ingredients))
    }

    fn fill(&mut self, recipe: Recipe, ingredients: Vec<RecipeIngredientEdit>) {
        self.name = recipe.name.clone();
        self.description = recipe.description.clone();
        self.beverage_type = recipe.beverage_type;
        self.batch_size = recipe.batch_size.to_string();
        self.batch_unit = recipe.batch_unit.clone();
        self.difficulty = recipe.difficulty;
        self.instructions = recipe.instructions.clone();
        self.notes = recipe.notes.clone();
        self.ingredients = ingredients;
        self.stored = Some(recipe);
    }

    pub fn recipe_id(&self) -> Option<RecipeId> {
        self.stored.as_ref().map(|r| r.id)
    }

    fn parsed_batch_size(&self) -> Option<f64> {
        self.batch_size
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|size| size.is_finite() && *size > 0.0)
    }

    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.parsed_batch_size().is_some()
    }

    pub fn add_ingredient(&mut self, ingredient: &Ingredient, quantity: f64, process_step: &str) {
        self.ingredients.push(RecipeIngredientEdit::new(
            ingredient.id,
            quantity,
            ingredient.category.default_unit(),
            process_step,
        ));
    }

    pub fn remove_ingredient(&mut self, index: usize) {
        if index < self.ingredients.len() {
            self.ingredients.remove(index);
        }
    }

    /// Writes the recipe and its ingredient list in one transaction. On success the form
    /// reloads what was stored, so new rows get their ids.
    pub fn save(&mut self, db: &mut Database) -> Option<RecipeId> {
        let Some(batch_size) = self.parsed_batch_size() else {
            self.error_message = Some(format!(
                "batch size must be a positive number, got {:?}",
                self.batch_size
            ));
            return None;
        };

        let result = match &self.stored {
            Some(stored) => {
                let recipe = Recipe {
                    name: self.name.clone(),
                    description: self.description.clone(),
                    beverage_type: self.beverage_type,
                    batch_size,
                    batch_unit: self.batch_unit.clone(),
                    difficulty: self.difficulty,
                    instructions: self.instructions.clone(),
                    notes: self.notes.clone(),
                    ..stored.clone()
                };
                let id = stored.id;
                db.recipes()
                    .update_with_ingredients(recipe, Some(self.ingredients.clone()))
                    .map(|()| id)
            }
            None => {
                let new_recipe = NewRecipe {
                    description: self.description.clone(),
                    batch_unit: self.batch_unit.clone(),
                    difficulty: self.difficulty,
                    instructions: self.instructions.clone(),
                    notes: self.notes.clone(),
                    ..NewRecipe::new(self.name.clone(), self.beverage_type, batch_size)
                };
                db.recipes()
                    .create_with_ingredients(new_recipe, self.ingredients.clone())
            }
        };
        let id = report(&mut self.error_message, result)?;

        let reloaded = Self::load(db, id);
        if let Some((recipe, ingredients)) = report(&mut self.error_message, reloaded) {
            self.fill(recipe, ingredients);
            self.error_message = None;
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{IngredientCategory, NewIngredient};

    fn honey(db: &mut Database) -> Ingredient {
        let id = db
            .ingredients()
            .create(NewIngredient::new("Orange Blossom Honey", IngredientCategory::Honey))
            .unwrap();
        db.ingredients().get(id).unwrap().unwrap()
    }

    #[test]
    fn completeness() {
        let mut form = RecipeForm::new_recipe(BeverageType::Mead);
        assert!(!form.is_complete());
        form.name = "Traditional".into();
        form.batch_size = "abc".into();
        assert!(!form.is_complete());
        form.batch_size = "-1".into();
        assert!(!form.is_complete());
        form.batch_size = " 1.5 ".into();
        assert!(form.is_complete());
    }

    #[test]
    fn create_then_edit() {
        let mut db = Database::open_in_memory().unwrap();
        let honey = honey(&mut db);

        let mut form = RecipeForm::new_recipe(BeverageType::Mead);
        form.name = "Orange Mead".into();
        form.batch_size = "1".into();
        form.add_ingredient(&honey, 3.0, "primary");
        assert_eq!(form.ingredients[0].unit, "pounds");
        assert_eq!(form.ingredients[0].id, None);

        let id = form.save(&mut db).unwrap();
        assert_eq!(form.recipe_id(), Some(id));
        assert!(form.ingredients[0].id.is_some());
        assert_eq!(form.error_message, None);

        let mut form = RecipeForm::edit(&mut db, id);
        assert_eq!(form.name, "Orange Mead");
        assert_eq!(form.batch_size, "1");
        form.ingredients[0].quantity = 3.5;
        form.notes = "back-sweetened".into();
        assert_eq!(form.save(&mut db), Some(id));

        let rows = db.recipe_ingredients().rows(id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, 3.5);
        assert_eq!(db.recipes().get(id).unwrap().unwrap().notes, "back-sweetened");
        assert_eq!(db.recipes().count().unwrap(), 1);
    }

    #[test]
    fn failed_save_keeps_the_form() {
        let mut db = Database::open_in_memory().unwrap();
        let honey = honey(&mut db);

        let mut form = RecipeForm::new_recipe(BeverageType::Mead);
        form.name = "Melomel".into();
        form.batch_size = "zero".into();
        form.add_ingredient(&honey, 2.0, "primary");
        assert_eq!(form.save(&mut db), None);
        assert!(form.error_message.is_some());
        assert_eq!(form.name, "Melomel");
        assert_eq!(form.ingredients.len(), 1);

        form.batch_size = "1".into();
        form.ingredients[0].quantity = -2.0;
        assert_eq!(form.save(&mut db), None);
        assert!(form.error_message.is_some());
        assert_eq!(form.ingredients[0].quantity, -2.0);
        assert_eq!(db.recipes().count().unwrap(), 0);

        form.ingredients[0].quantity = 2.0;
        assert!(form.save(&mut db).is_some());
        assert_eq!(form.error_message, None);
    }

    #[test]
    fn editing_a_missing_recipe() {
        let mut db = Database::open_in_memory().unwrap();
        let form = RecipeForm::edit(&mut db, 9.into());
        assert_eq!(form.error_message.as_deref(), Some("recipe 9 not found"));
        assert_eq!(form.recipe_id(), None);
    }

    #[test]
    fn removing_ingredients() {
        let mut db = Database::open_in_memory().unwrap();
        let honey = honey(&mut db);
        let mut form = RecipeForm::new_recipe(BeverageType::Mead);
        form.add_ingredient(&honey, 1.0, "primary");
        form.add_ingredient(&honey, 0.5, "secondary");
        form.remove_ingredient(5);
        form.remove_ingredient(0);
        assert_eq!(form.ingredients.len(), 1);
        assert_eq!(form.ingredients[0].process_step, "secondary");
    }
}
