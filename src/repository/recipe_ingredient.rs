// Copyright 2023 Remi Bernotavicius

use super::recipe;
use crate::database::models::{
    Ingredient, IngredientId, NewRecipeIngredient, RecipeId, RecipeIngredient, RecipeIngredientId,
};
use crate::database::schema::{ingredients, recipe_ingredients};
use crate::database::watch::{Table, Watchable};
use crate::database::{Connection, Database};
use crate::error::{RepositoryError, Result};
use diesel::dsl::sum;
use diesel::prelude::AsChangeset;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::HashSet;

/// One row of a recipe's ingredient list as the editor sees it. Rows read back from storage
/// keep their id so that saving updates them in place, and actual cost is never part of an
/// edit.
#[derive(AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
#[diesel(treat_none_as_null = true)]
pub struct RecipeIngredientEdit {
    pub id: Option<RecipeIngredientId>,
    pub ingredient_id: IngredientId,
    pub quantity: f64,
    pub unit: String,
    pub process_step: String,
    pub addition_time_minutes: i32,
    pub duration_minutes: Option<i32>,
    pub substitute_ingredient_id: Option<IngredientId>,
    pub is_optional: bool,
    pub is_critical_timing: bool,
    pub priority: i32,
    pub gravity_contribution: Option<f64>,
    pub bitterness_contribution: Option<f64>,
    pub color_contribution: Option<f64>,
    pub estimated_cost: Option<f64>,
    pub notes: String,
}

impl RecipeIngredientEdit {
    pub fn new(
        ingredient_id: IngredientId,
        quantity: f64,
        unit: impl Into<String>,
        process_step: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            ingredient_id,
            quantity,
            unit: unit.into(),
            process_step: process_step.into(),
            addition_time_minutes: 0,
            duration_minutes: None,
            substitute_ingredient_id: None,
            is_optional: false,
            is_critical_timing: false,
            priority: 0,
            gravity_contribution: None,
            bitterness_contribution: None,
            color_contribution: None,
            estimated_cost: None,
            notes: String::new(),
        }
    }

    pub fn from_row(row: &RecipeIngredient) -> Self {
        Self {
            id: Some(row.id),
            ingredient_id: row.ingredient_id,
            quantity: row.quantity,
            unit: row.unit.clone(),
            process_step: row.process_step.clone(),
            addition_time_minutes: row.addition_time_minutes,
            duration_minutes: row.duration_minutes,
            substitute_ingredient_id: row.substitute_ingredient_id,
            is_optional: row.is_optional,
            is_critical_timing: row.is_critical_timing,
            priority: row.priority,
            gravity_contribution: row.gravity_contribution,
            bitterness_contribution: row.bitterness_contribution,
            color_contribution: row.color_contribution,
            estimated_cost: row.estimated_cost,
            notes: row.notes.clone(),
        }
    }

    fn to_new_row(&self, recipe_id: RecipeId) -> NewRecipeIngredient {
        NewRecipeIngredient {
            recipe_id,
            ingredient_id: self.ingredient_id,
            quantity: self.quantity,
            unit: self.unit.clone(),
            process_step: self.process_step.clone(),
            addition_time_minutes: self.addition_time_minutes,
            duration_minutes: self.duration_minutes,
            substitute_ingredient_id: self.substitute_ingredient_id,
            is_optional: self.is_optional,
            is_critical_timing: self.is_critical_timing,
            priority: self.priority,
            gravity_contribution: self.gravity_contribution,
            bitterness_contribution: self.bitterness_contribution,
            color_contribution: self.color_contribution,
            estimated_cost: self.estimated_cost,
            actual_cost: None,
            notes: self.notes.clone(),
        }
    }
}

/// Null-safe sums over a recipe's ingredient rows. A field is `None` when no row sets it.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct ContributionTotals {
    pub gravity: Option<f64>,
    pub bitterness: Option<f64>,
    pub color: Option<f64>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
}

/// A recipe's ingredients in brewing order, for a live query.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BrewingSequence(pub RecipeId);

impl Watchable for BrewingSequence {
    type Item = (RecipeIngredient, Ingredient);

    fn tables(&self) -> &'static [Table] {
        &[Table::RecipeIngredients, Table::Ingredients]
    }

    fn load(&self, db: &mut Database) -> Result<Vec<Self::Item>> {
        db.recipe_ingredients().list(self.0)
    }
}

pub(super) fn totals_of(conn: &mut Connection, recipe_id: RecipeId) -> Result<ContributionTotals> {
    let (gravity, bitterness, color, estimated_cost, actual_cost) = recipe_ingredients::table
        .filter(recipe_ingredients::recipe_id.eq(recipe_id))
        .select((
            sum(recipe_ingredients::gravity_contribution),
            sum(recipe_ingredients::bitterness_contribution),
            sum(recipe_ingredients::color_contribution),
            sum(recipe_ingredients::estimated_cost),
            sum(recipe_ingredients::actual_cost),
        ))
        .get_result::<(
            Option<f64>,
            Option<f64>,
            Option<f64>,
            Option<f64>,
            Option<f64>,
        )>(conn)?;
    Ok(ContributionTotals {
        gravity,
        bitterness,
        color,
        estimated_cost,
        actual_cost,
    })
}

fn validate_edit(edit: &RecipeIngredientEdit) -> Result<()> {
    if !(edit.quantity.is_finite() && edit.quantity >= 0.0) {
        return Err(RepositoryError::invalid(format!(
            "quantity must be a non-negative amount, got {}",
            edit.quantity
        )));
    }
    if edit.process_step.trim().is_empty() {
        return Err(RepositoryError::invalid("process step must not be empty"));
    }
    Ok(())
}

fn ensure_ingredient_exists(conn: &mut Connection, id: IngredientId) -> Result<()> {
    let count: i64 = ingredients::table.find(id).count().get_result(conn)?;
    if count == 0 {
        return Err(RepositoryError::ingredient_not_found(id));
    }
    Ok(())
}

/// Brings the stored rows of `recipe_id` in line with `edits`, matching rows by id. Must
/// run inside a transaction.
pub(super) fn merge_rows(
    conn: &mut Connection,
    recipe_id: RecipeId,
    edits: Vec<RecipeIngredientEdit>,
) -> Result<()> {
    let existing: HashSet<RecipeIngredientId> = recipe_ingredients::table
        .filter(recipe_ingredients::recipe_id.eq(recipe_id))
        .select(recipe_ingredients::id)
        .load::<RecipeIngredientId>(conn)?
        .into_iter()
        .collect();

    let mut kept = HashSet::new();
    let mut inserts = vec![];
    for edit in &edits {
        validate_edit(edit)?;
        ensure_ingredient_exists(conn, edit.ingredient_id)?;
        if let Some(substitute) = edit.substitute_ingredient_id {
            ensure_ingredient_exists(conn, substitute)?;
        }
        match edit.id {
            Some(row_id) if existing.contains(&row_id) => {
                if !kept.insert(row_id) {
                    return Err(RepositoryError::invalid(format!(
                        "ingredient row {row_id} is listed more than once"
                    )));
                }
                diesel::update(recipe_ingredients::table.find(row_id))
                    .set(edit)
                    .execute(conn)?;
            }
            Some(row_id) => {
                return Err(RepositoryError::invalid(format!(
                    "ingredient row {row_id} does not belong to recipe {recipe_id}"
                )));
            }
            None => inserts.push(edit.to_new_row(recipe_id)),
        }
    }

    let removed: Vec<RecipeIngredientId> = existing.difference(&kept).copied().collect();
    if !removed.is_empty() {
        diesel::delete(recipe_ingredients::table.filter(recipe_ingredients::id.eq_any(&removed)))
            .execute(conn)?;
    }
    if !inserts.is_empty() {
        diesel::insert_into(recipe_ingredients::table)
            .values(&inserts)
            .execute(conn)?;
    }
    log::debug!(
        "recipe {recipe_id}: {} rows updated, {} inserted, {} removed",
        kept.len(),
        inserts.len(),
        removed.len()
    );
    recipe::touch(conn, recipe_id)
}

pub struct RecipeIngredientRepository<'db> {
    db: &'db mut Database,
}

impl<'db> RecipeIngredientRepository<'db> {
    pub(crate) fn new(db: &'db mut Database) -> Self {
        Self { db }
    }

    /// The ingredient list in brewing order: process step, then addition time, then
    /// highest priority first.
    pub fn list(&mut self, recipe_id: RecipeId) -> Result<Vec<(RecipeIngredient, Ingredient)>> {
        Ok(recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .order((
                recipe_ingredients::process_step.asc(),
                recipe_ingredients::addition_time_minutes.asc(),
                recipe_ingredients::priority.desc(),
                recipe_ingredients::id.asc(),
            ))
            .select((RecipeIngredient::as_select(), Ingredient::as_select()))
            .load(self.db.connection())?)
    }

    /// Every stored row of a recipe in insertion order, including rows of soft-deleted
    /// recipes.
    pub fn rows(&mut self, recipe_id: RecipeId) -> Result<Vec<RecipeIngredient>> {
        Ok(recipe_ingredients::table
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .order(recipe_ingredients::id.asc())
            .select(RecipeIngredient::as_select())
            .load(self.db.connection())?)
    }

    /// Saves an edited ingredient list. Rows named by id are updated in place and keep any
    /// reconciled actual cost, rows without an id are added, and rows left out are removed.
    pub fn replace_all(
        &mut self,
        recipe_id: RecipeId,
        edits: Vec<RecipeIngredientEdit>,
    ) -> Result<()> {
        self.db
            .write(&[Table::RecipeIngredients, Table::Recipes], |conn| {
                recipe::require_active(conn, recipe_id)?;
                merge_rows(conn, recipe_id, edits)
            })?;
        log::info!("saved ingredient list of recipe {recipe_id}");
        Ok(())
    }

    pub fn totals(&mut self, recipe_id: RecipeId) -> Result<ContributionTotals> {
        totals_of(self.db.connection(), recipe_id)
    }
}
