// Copyright 2023 Remi Bernotavicius

use super::recipe_ingredient::{self, RecipeIngredientEdit};
use super::{now, Needle};
use crate::database::models::{
    BeverageType, NewRecipe, NewRecipeIngredient, Recipe, RecipeId, RecipeIngredient,
};
use crate::database::schema::{recipe_ingredients, recipes};
use crate::database::watch::{Table, Watchable};
use crate::database::{self, Connection, Database};
use crate::error::{RepositoryError, Result};
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::HashSet;

/// The recipe list views, usable directly or through a live query.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipeQuery {
    All,
    Search(String),
    ByType(BeverageType),
    Favorites,
    Recent(usize),
}

impl Watchable for RecipeQuery {
    type Item = Recipe;

    fn tables(&self) -> &'static [Table] {
        &[Table::Recipes]
    }

    fn load(&self, db: &mut Database) -> Result<Vec<Recipe>> {
        db.recipes().query(self)
    }
}

fn validate_fields(name: &str, batch_size: f64, difficulty: i32) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RepositoryError::invalid("recipe name must not be empty"));
    }
    if !(batch_size.is_finite() && batch_size > 0.0) {
        return Err(RepositoryError::invalid(format!(
            "batch size must be positive, got {batch_size}"
        )));
    }
    if !(1..=5).contains(&difficulty) {
        return Err(RepositoryError::invalid(format!(
            "difficulty must be between 1 and 5, got {difficulty}"
        )));
    }
    Ok(())
}

fn find_stored(conn: &mut Connection, id: RecipeId) -> Result<Option<Recipe>> {
    Ok(recipes::table
        .find(id)
        .select(Recipe::as_select())
        .first(conn)
        .optional()?)
}

fn find_active(conn: &mut Connection, id: RecipeId) -> Result<Option<Recipe>> {
    Ok(recipes::table
        .find(id)
        .filter(recipes::is_deleted.eq(false))
        .select(Recipe::as_select())
        .first(conn)
        .optional()?)
}

pub(super) fn require_active(conn: &mut Connection, id: RecipeId) -> Result<Recipe> {
    find_active(conn, id)?.ok_or(RepositoryError::recipe_not_found(id))
}

pub(super) fn touch(conn: &mut Connection, id: RecipeId) -> Result<()> {
    diesel::update(recipes::table.find(id))
        .set(recipes::updated_at.eq(now()))
        .execute(conn)?;
    Ok(())
}

fn insert_recipe(conn: &mut Connection, new_recipe: &NewRecipe) -> Result<RecipeId> {
    let timestamp = now();
    diesel::insert_into(recipes::table)
        .values((
            new_recipe,
            recipes::created_at.eq(timestamp),
            recipes::updated_at.eq(timestamp),
        ))
        .execute(conn)?;
    Ok(database::last_insert_rowid(conn)?.into())
}

/// The chain from `start` up to its root, `start` first. Stops early if the stored chain
/// loops back on itself.
fn chain_from(conn: &mut Connection, start: RecipeId) -> Result<Vec<Recipe>> {
    let mut chain = vec![];
    let mut seen = HashSet::new();
    let mut next = Some(start);
    while let Some(id) = next {
        if !seen.insert(id) {
            log::warn!("recipe {start} has a parent cycle through {id}");
            break;
        }
        let Some(recipe) = find_stored(conn, id)? else {
            break;
        };
        next = recipe.parent_recipe_id;
        chain.push(recipe);
    }
    Ok(chain)
}

fn ensure_acyclic(conn: &mut Connection, child: RecipeId, parent: RecipeId) -> Result<()> {
    if chain_from(conn, parent)?.iter().any(|r| r.id == child) {
        return Err(RepositoryError::invalid(format!(
            "recipe {parent} descends from recipe {child}, it cannot become its parent"
        )));
    }
    Ok(())
}

fn validate_parent(conn: &mut Connection, child: Option<RecipeId>, parent: RecipeId) -> Result<()> {
    if find_stored(conn, parent)?.is_none() {
        return Err(RepositoryError::recipe_not_found(parent));
    }
    if let Some(child) = child {
        ensure_acyclic(conn, child, parent)?;
    }
    Ok(())
}

/// Highest version among `root` and everything descending from it.
fn max_family_version(conn: &mut Connection, root: &Recipe) -> Result<i32> {
    let mut max_version = root.version;
    let mut seen = HashSet::from([root.id]);
    let mut frontier = vec![root.id];
    while !frontier.is_empty() {
        let children: Vec<(RecipeId, i32)> = recipes::table
            .filter(recipes::parent_recipe_id.eq_any(&frontier))
            .select((recipes::id, recipes::version))
            .load(conn)?;
        frontier.clear();
        for (child, version) in children {
            if seen.insert(child) {
                max_version = max_version.max(version);
                frontier.push(child);
            }
        }
    }
    Ok(max_version)
}

/// Inserts `new_recipe` and a copy of every ingredient row of `source`, passing each copy
/// through `adjust` first.
fn copy_recipe(
    conn: &mut Connection,
    source: &Recipe,
    new_recipe: &NewRecipe,
    adjust: impl Fn(NewRecipeIngredient) -> NewRecipeIngredient,
) -> Result<RecipeId> {
    let new_id = insert_recipe(conn, new_recipe)?;

    let usages: Vec<RecipeIngredient> = recipe_ingredients::table
        .filter(recipe_ingredients::recipe_id.eq(source.id))
        .order(recipe_ingredients::id.asc())
        .select(RecipeIngredient::as_select())
        .load(conn)?;
    let copies: Vec<NewRecipeIngredient> = usages
        .iter()
        .map(|usage| adjust(NewRecipeIngredient::copy_of(usage, new_id)))
        .collect();
    if !copies.is_empty() {
        diesel::insert_into(recipe_ingredients::table)
            .values(&copies)
            .execute(conn)?;
    }
    Ok(new_id)
}

pub struct RecipeRepository<'db> {
    db: &'db mut Database,
}

impl<'db> RecipeRepository<'db> {
    pub(crate) fn new(db: &'db mut Database) -> Self {
        Self { db }
    }

    pub fn create(&mut self, new_recipe: NewRecipe) -> Result<RecipeId> {
        self.create_with_ingredients(new_recipe, vec![])
    }

    pub fn create_with_ingredients(
        &mut self,
        new_recipe: NewRecipe,
        ingredients: Vec<RecipeIngredientEdit>,
    ) -> Result<RecipeId> {
        validate_fields(
            &new_recipe.name,
            new_recipe.batch_size,
            new_recipe.difficulty,
        )?;
        let id = self
            .db
            .write(&[Table::Recipes, Table::RecipeIngredients], |conn| {
                if let Some(parent) = new_recipe.parent_recipe_id {
                    validate_parent(conn, None, parent)?;
                }
                let id = insert_recipe(conn, &new_recipe)?;
                if !ingredients.is_empty() {
                    recipe_ingredient::merge_rows(conn, id, ingredients)?;
                }
                Ok(id)
            })?;
        log::info!("created recipe {id} {:?}", new_recipe.name);
        Ok(id)
    }

    /// Returns `None` for absent and soft-deleted recipes.
    pub fn get(&mut self, id: RecipeId) -> Result<Option<Recipe>> {
        find_active(self.db.connection(), id)
    }

    /// Replaces every field of a stored recipe. The creation time and deletion flag are kept.
    pub fn update(&mut self, recipe: Recipe) -> Result<()> {
        self.update_with_ingredients(recipe, None)
    }

    /// Replaces a recipe and, when given, merges its ingredient list, in one transaction.
    pub fn update_with_ingredients(
        &mut self,
        recipe: Recipe,
        ingredients: Option<Vec<RecipeIngredientEdit>>,
    ) -> Result<()> {
        validate_fields(&recipe.name, recipe.batch_size, recipe.difficulty)?;
        let id = recipe.id;
        self.db
            .write(&[Table::Recipes, Table::RecipeIngredients], |conn| {
                let stored = require_active(conn, recipe.id)?;
                if let Some(parent) = recipe.parent_recipe_id {
                    if recipe.parent_recipe_id != stored.parent_recipe_id {
                        validate_parent(conn, Some(recipe.id), parent)?;
                    }
                }
                let row = Recipe {
                    created_at: stored.created_at,
                    updated_at: now(),
                    is_deleted: false,
                    ..recipe
                };
                diesel::update(&row).set(&row).execute(conn)?;
                if let Some(ingredients) = ingredients {
                    recipe_ingredient::merge_rows(conn, row.id, ingredients)?;
                }
                Ok(())
            })?;
        log::info!("updated recipe {id}");
        Ok(())
    }

    pub fn all(&mut self) -> Result<Vec<Recipe>> {
        self.query(&RecipeQuery::All)
    }

    /// Case-insensitive substring search over name and description. Names starting with
    /// `text` come first, then the most recently updated.
    pub fn search(&mut self, text: &str) -> Result<Vec<Recipe>> {
        self.query(&RecipeQuery::Search(text.into()))
    }

    pub fn filter_by_type(&mut self, beverage_type: BeverageType) -> Result<Vec<Recipe>> {
        self.query(&RecipeQuery::ByType(beverage_type))
    }

    pub fn favorites(&mut self) -> Result<Vec<Recipe>> {
        self.query(&RecipeQuery::Favorites)
    }

    pub fn recent(&mut self, n: usize) -> Result<Vec<Recipe>> {
        self.query(&RecipeQuery::Recent(n))
    }

    pub fn query(&mut self, query: &RecipeQuery) -> Result<Vec<Recipe>> {
        let conn = self.db.connection();
        let active = recipes::table
            .filter(recipes::is_deleted.eq(false))
            .order((recipes::updated_at.desc(), recipes::id.desc()))
            .select(Recipe::as_select());

        let found: Vec<Recipe> = match query {
            RecipeQuery::All => active.load(conn)?,
            RecipeQuery::Search(text) => {
                let needle = Needle::new(text);
                let mut found: Vec<Recipe> = active
                    .load::<Recipe>(conn)?
                    .into_iter()
                    .filter(|r| needle.found_in(&r.name) || needle.found_in(&r.description))
                    .collect();
                // Stable, so recency order survives inside each group.
                found.sort_by_key(|r| !needle.starts(&r.name));
                found
            }
            RecipeQuery::ByType(beverage_type) => active
                .filter(recipes::beverage_type.eq(*beverage_type))
                .load(conn)?,
            RecipeQuery::Favorites => active.filter(recipes::is_favorite.eq(true)).load(conn)?,
            RecipeQuery::Recent(n) => active
                .limit(i64::try_from(*n).unwrap_or(i64::MAX))
                .load(conn)?,
        };
        log::debug!("{query:?} matched {} recipes", found.len());
        Ok(found)
    }

    pub fn count(&mut self) -> Result<usize> {
        let count: i64 = recipes::table
            .filter(recipes::is_deleted.eq(false))
            .count()
            .get_result(self.db.connection())?;
        Ok(count as usize)
    }

    pub fn toggle_favorite(&mut self, id: RecipeId) -> Result<bool> {
        self.db.write(&[Table::Recipes], |conn| {
            let recipe = require_active(conn, id)?;
            let favorite = !recipe.is_favorite;
            diesel::update(recipes::table.find(id))
                .set(recipes::is_favorite.eq(favorite))
                .execute(conn)?;
            log::info!("recipe {id} favorite: {favorite}");
            Ok(favorite)
        })
    }

    /// Hides a recipe from every view. Its ingredient rows stay in storage.
    pub fn soft_delete(&mut self, id: RecipeId) -> Result<()> {
        self.db.write(&[Table::Recipes], |conn| {
            require_active(conn, id)?;
            diesel::update(recipes::table.find(id))
                .set((recipes::is_deleted.eq(true), recipes::updated_at.eq(now())))
                .execute(conn)?;
            Ok(())
        })?;
        log::info!("soft-deleted recipe {id}");
        Ok(())
    }

    /// Removes the recipe row, its ingredient rows with it. Recipes derived from it lose
    /// their parent reference.
    pub fn hard_delete(&mut self, id: RecipeId) -> Result<()> {
        self.db
            .write(&[Table::Recipes, Table::RecipeIngredients], |conn| {
                let deleted = diesel::delete(recipes::table.find(id)).execute(conn)?;
                if deleted == 0 {
                    return Err(RepositoryError::recipe_not_found(id));
                }
                Ok(())
            })?;
        log::info!("deleted recipe {id}");
        Ok(())
    }

    /// Copies a recipe and all of its ingredients under a new name. The copy is version 1
    /// and points back at the original.
    pub fn duplicate(&mut self, id: RecipeId, new_name: &str) -> Result<RecipeId> {
        if new_name.trim().is_empty() {
            return Err(RepositoryError::invalid("recipe name must not be empty"));
        }
        let new_id = self
            .db
            .write(&[Table::Recipes, Table::RecipeIngredients], |conn| {
                let source = require_active(conn, id)?;
                let new_recipe = NewRecipe {
                    name: new_name.into(),
                    version: 1,
                    parent_recipe_id: Some(id),
                    ..NewRecipe::from(&source)
                };
                copy_recipe(conn, &source, &new_recipe, |usage| usage)
            })?;
        log::info!("duplicated recipe {id} as {new_id}");
        Ok(new_id)
    }

    /// Copies a recipe at a new batch volume, multiplying every ingredient quantity and
    /// contribution by `new_batch_size / batch_size`. Scales from this recipe, not from the
    /// root of its family.
    pub fn scale(&mut self, id: RecipeId, new_batch_size: f64) -> Result<RecipeId> {
        if !(new_batch_size.is_finite() && new_batch_size > 0.0) {
            return Err(RepositoryError::invalid(format!(
                "target batch size must be positive, got {new_batch_size}"
            )));
        }
        let (new_id, factor) = self
            .db
            .write(&[Table::Recipes, Table::RecipeIngredients], |conn| {
                let source = require_active(conn, id)?;
                if source.batch_size <= 0.0 {
                    return Err(RepositoryError::invalid(format!(
                        "recipe {id} has batch size {}, it cannot be scaled",
                        source.batch_size
                    )));
                }
                let factor = new_batch_size / source.batch_size;
                let new_recipe = NewRecipe {
                    name: format!(
                        "{} (scaled to {new_batch_size} {})",
                        source.name, source.batch_unit
                    ),
                    batch_size: new_batch_size,
                    version: 1,
                    parent_recipe_id: Some(id),
                    ..NewRecipe::from(&source)
                };
                let new_id = copy_recipe(conn, &source, &new_recipe, |usage| {
                    usage.scaled(factor)
                })?;
                Ok((new_id, factor))
            })?;
        log::info!("scaled recipe {id} by {factor} as {new_id}");
        Ok(new_id)
    }

    /// Copies a recipe as the next version of its family. The new recipe hangs off the
    /// family root, and `change_description` is appended to its notes.
    pub fn create_variation(
        &mut self,
        parent_id: RecipeId,
        change_description: &str,
    ) -> Result<RecipeId> {
        let new_id = self
            .db
            .write(&[Table::Recipes, Table::RecipeIngredients], |conn| {
                let source = require_active(conn, parent_id)?;
                let chain = chain_from(conn, parent_id)?;
                let root = chain.last().unwrap_or(&source);
                let version = max_family_version(conn, root)? + 1;

                let change = format!("v{version}: {}", change_description.trim());
                let notes = if source.notes.trim().is_empty() {
                    change
                } else {
                    format!("{}\n{change}", source.notes.trim_end())
                };
                let new_recipe = NewRecipe {
                    name: format!("{} (v{version})", root.name),
                    notes,
                    version,
                    parent_recipe_id: Some(root.id),
                    ..NewRecipe::from(&source)
                };
                copy_recipe(conn, &source, &new_recipe, |usage| usage)
            })?;
        log::info!("created variation {new_id} of recipe {parent_id}");
        Ok(new_id)
    }

    /// Sets or clears the parent of a recipe. Refuses any assignment that would make the
    /// recipe its own ancestor.
    pub fn set_parent(&mut self, id: RecipeId, parent: Option<RecipeId>) -> Result<()> {
        self.db.write(&[Table::Recipes], |conn| {
            require_active(conn, id)?;
            if let Some(parent) = parent {
                validate_parent(conn, Some(id), parent)?;
            }
            diesel::update(recipes::table.find(id))
                .set((
                    recipes::parent_recipe_id.eq(parent),
                    recipes::updated_at.eq(now()),
                ))
                .execute(conn)?;
            Ok(())
        })
    }

    /// The recipe followed by each of its ancestors, root last.
    pub fn lineage(&mut self, id: RecipeId) -> Result<Vec<Recipe>> {
        let conn = self.db.connection();
        require_active(conn, id)?;
        chain_from(conn, id)
    }

    pub fn variations(&mut self, id: RecipeId) -> Result<Vec<Recipe>> {
        Ok(recipes::table
            .filter(recipes::parent_recipe_id.eq(id))
            .filter(recipes::is_deleted.eq(false))
            .order((recipes::version.asc(), recipes::id.asc()))
            .select(Recipe::as_select())
            .load(self.db.connection())?)
    }

    /// Sum of the estimated cost of every ingredient, or `None` when none has one.
    pub fn calculate_cost(&mut self, id: RecipeId) -> Result<Option<f64>> {
        let conn = self.db.connection();
        require_active(conn, id)?;
        Ok(recipe_ingredient::totals_of(conn, id)?.estimated_cost)
    }

    /// Spreads what a batch actually cost over its ingredients in proportion to their
    /// estimated costs. Does nothing when there is no estimate to go by.
    pub fn reconcile_actual_cost(&mut self, id: RecipeId, actual_total: f64) -> Result<()> {
        if !(actual_total.is_finite() && actual_total >= 0.0) {
            return Err(RepositoryError::invalid(format!(
                "actual cost must be a non-negative amount, got {actual_total}"
            )));
        }
        self.db.write(&[Table::RecipeIngredients], |conn| {
            require_active(conn, id)?;
            let estimated_total = match recipe_ingredient::totals_of(conn, id)?.estimated_cost {
                Some(total) if total != 0.0 => total,
                _ => {
                    log::debug!("recipe {id} has no estimated cost to reconcile against");
                    return Ok(());
                }
            };
            let ratio = actual_total / estimated_total;

            let usages: Vec<RecipeIngredient> = recipe_ingredients::table
                .filter(recipe_ingredients::recipe_id.eq(id))
                .select(RecipeIngredient::as_select())
                .load(conn)?;
            for usage in usages {
                if let Some(estimated) = usage.estimated_cost {
                    diesel::update(recipe_ingredients::table.find(usage.id))
                        .set(recipe_ingredients::actual_cost.eq(Some(estimated * ratio)))
                        .execute(conn)?;
                }
            }
            log::info!("reconciled recipe {id} to actual cost {actual_total}");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{IngredientCategory, IngredientId, NewIngredient};
    use crate::repository::RecipeIngredientEdit;

    const EPSILON: f64 = 1e-9;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn honey(db: &mut Database) -> IngredientId {
        db.ingredients()
            .create(NewIngredient::new("Wildflower Honey", IngredientCategory::Honey))
            .unwrap()
    }

    fn usage(ingredient: IngredientId, quantity: f64, step: &str) -> RecipeIngredientEdit {
        RecipeIngredientEdit::new(ingredient, quantity, "pounds", step)
    }

    /// A 5 gallon beer with two costed ingredients.
    fn pale_ale(db: &mut Database) -> RecipeId {
        let malt = db
            .ingredients()
            .create(NewIngredient::new("Pale Malt", IngredientCategory::Grain))
            .unwrap();
        let hops = db
            .ingredients()
            .create(NewIngredient::new("Cascade", IngredientCategory::Hops))
            .unwrap();
        let mut malt_usage = usage(malt, 10.0, "mash");
        malt_usage.estimated_cost = Some(15.0);
        malt_usage.gravity_contribution = Some(40.0);
        let mut hop_usage = usage(hops, 1.5, "boil");
        hop_usage.unit = "ounces".into();
        hop_usage.addition_time_minutes = 60;
        hop_usage.estimated_cost = Some(5.0);
        hop_usage.bitterness_contribution = Some(35.0);
        db.recipes()
            .create_with_ingredients(
                NewRecipe::new("Pale Ale", BeverageType::Beer, 5.0),
                vec![malt_usage, hop_usage],
            )
            .unwrap()
    }

    fn quantities(db: &mut Database, id: RecipeId) -> Vec<(String, f64, String)> {
        db.recipe_ingredients()
            .list(id)
            .unwrap()
            .into_iter()
            .map(|(usage, ingredient)| (ingredient.name, usage.quantity, usage.unit))
            .collect()
    }

    #[test]
    fn create_and_get() {
        let mut db = test_db();
        let id = db
            .recipes()
            .create(NewRecipe::new("Traditional Mead", BeverageType::Mead, 5.0))
            .unwrap();
        let recipe = db.recipes().get(id).unwrap().unwrap();
        assert_eq!(recipe.name, "Traditional Mead");
        assert_eq!(recipe.beverage_type, BeverageType::Mead);
        assert_eq!(recipe.version, 1);
        assert_eq!(recipe.parent_recipe_id, None);
        assert!(recipe.is_complete());
        assert!(!recipe.is_favorite);
        assert!(db.recipes().get(RecipeId::from(999)).unwrap().is_none());
    }

    #[test]
    fn create_rejects_incomplete_recipes() {
        let mut db = test_db();
        for new_recipe in [
            NewRecipe::new("  ", BeverageType::Beer, 5.0),
            NewRecipe::new("Nothing", BeverageType::Beer, 0.0),
            NewRecipe::new("Negative", BeverageType::Beer, -1.0),
            NewRecipe {
                difficulty: 6,
                ..NewRecipe::new("Too Hard", BeverageType::Beer, 5.0)
            },
        ] {
            let err = db.recipes().create(new_recipe).unwrap_err();
            assert!(matches!(err, RepositoryError::InvalidArgument(_)), "{err}");
        }
        assert_eq!(db.recipes().count().unwrap(), 0);
    }

    #[test]
    fn create_rejects_missing_parent() {
        let mut db = test_db();
        let err = db
            .recipes()
            .create(NewRecipe {
                parent_recipe_id: Some(RecipeId::from(42)),
                ..NewRecipe::new("Orphan", BeverageType::Cider, 3.0)
            })
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_replaces_fields() {
        let mut db = test_db();
        let id = db
            .recipes()
            .create(NewRecipe::new("Cider", BeverageType::Cider, 5.0))
            .unwrap();
        let mut recipe = db.recipes().get(id).unwrap().unwrap();
        let created_at = recipe.created_at;
        recipe.name = "Dry Cider".into();
        recipe.original_gravity = Some(1.050);
        recipe.difficulty = 2;
        db.recipes().update(recipe).unwrap();

        let stored = db.recipes().get(id).unwrap().unwrap();
        assert_eq!(stored.name, "Dry Cider");
        assert_eq!(stored.original_gravity, Some(1.050));
        assert_eq!(stored.difficulty, 2);
        assert_eq!(stored.created_at, created_at);

        let mut cleared = stored.clone();
        cleared.original_gravity = None;
        db.recipes().update(cleared).unwrap();
        assert_eq!(db.recipes().get(id).unwrap().unwrap().original_gravity, None);

        let mut missing = stored;
        missing.id = RecipeId::from(77);
        assert!(db.recipes().update(missing).unwrap_err().is_not_found());
    }

    #[test]
    fn search_ranks_prefix_matches_first() {
        let mut db = test_db();
        let mut new_recipe = NewRecipe::new("Orange Blossom Mead", BeverageType::Mead, 5.0);
        let blossom = db.recipes().create(new_recipe.clone()).unwrap();
        new_recipe.name = "Spiced Metheglin".into();
        new_recipe.description = "A MEAD with cinnamon".into();
        let described = db.recipes().create(new_recipe.clone()).unwrap();
        new_recipe.name = "Mead of the Gods".into();
        new_recipe.description = String::new();
        let prefix = db.recipes().create(new_recipe.clone()).unwrap();
        new_recipe.name = "Brown Ale".into();
        db.recipes().create(new_recipe).unwrap();

        let found: Vec<_> = db
            .recipes()
            .search("mead")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(found, vec![prefix, described, blossom]);
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let mut db = test_db();
        db.recipes()
            .create(NewRecipe::new("100% Brett", BeverageType::Beer, 5.0))
            .unwrap();
        db.recipes()
            .create(NewRecipe::new("1000 IBU", BeverageType::Beer, 5.0))
            .unwrap();
        let found = db.recipes().search("100%").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "100% Brett");
        assert_eq!(db.recipes().search("").unwrap().len(), 2);
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let mut db = test_db();
        db.recipes()
            .create(NewRecipe::new("Märzen", BeverageType::Beer, 5.0))
            .unwrap();
        let mut kolsch = NewRecipe::new("Summer Lager", BeverageType::Beer, 5.0);
        kolsch.description = "Kölsch-style, lagered cold".into();
        db.recipes().create(kolsch).unwrap();

        let found = db.recipes().search("MÄRZEN").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Märzen");
        let found = db.recipes().search("KÖLSCH").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Summer Lager");
    }

    #[test]
    fn views_filter_and_order() {
        let mut db = test_db();
        let beer = db
            .recipes()
            .create(NewRecipe::new("Stout", BeverageType::Beer, 5.0))
            .unwrap();
        let wine = db
            .recipes()
            .create(NewRecipe::new("Merlot", BeverageType::Wine, 6.0))
            .unwrap();
        let mead = db
            .recipes()
            .create(NewRecipe::new("Sack Mead", BeverageType::Mead, 1.0))
            .unwrap();

        let ids = |recipes: Vec<Recipe>| recipes.into_iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(db.recipes().filter_by_type(BeverageType::Wine).unwrap()), vec![wine]);
        assert_eq!(ids(db.recipes().recent(2).unwrap()), vec![mead, wine]);
        assert_eq!(ids(db.recipes().all().unwrap()), vec![mead, wine, beer]);

        assert!(db.recipes().toggle_favorite(beer).unwrap());
        assert_eq!(ids(db.recipes().favorites().unwrap()), vec![beer]);
        assert!(!db.recipes().toggle_favorite(beer).unwrap());
        assert!(db.recipes().favorites().unwrap().is_empty());
    }

    #[test]
    fn toggle_favorite_of_missing_recipe() {
        let mut db = test_db();
        let err = db.recipes().toggle_favorite(RecipeId::from(3)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn soft_delete_hides_but_keeps_ingredient_rows() {
        let mut db = test_db();
        let id = pale_ale(&mut db);
        db.recipes().toggle_favorite(id).unwrap();
        db.recipes().soft_delete(id).unwrap();

        assert!(db.recipes().get(id).unwrap().is_none());
        assert!(db.recipes().search("pale").unwrap().is_empty());
        assert!(db.recipes().filter_by_type(BeverageType::Beer).unwrap().is_empty());
        assert!(db.recipes().favorites().unwrap().is_empty());
        assert!(db.recipes().recent(10).unwrap().is_empty());
        assert_eq!(db.recipe_ingredients().rows(id).unwrap().len(), 2);

        assert!(db.recipes().soft_delete(id).unwrap_err().is_not_found());
    }

    #[test]
    fn hard_delete_cascades() {
        let mut db = test_db();
        let id = pale_ale(&mut db);
        let copy = db.recipes().duplicate(id, "Copy").unwrap();
        db.recipes().hard_delete(id).unwrap();

        assert!(db.recipe_ingredients().rows(id).unwrap().is_empty());
        let copy = db.recipes().get(copy).unwrap().unwrap();
        assert_eq!(copy.parent_recipe_id, None);
        assert_eq!(db.recipe_ingredients().rows(copy.id).unwrap().len(), 2);
        assert!(db.recipes().hard_delete(id).unwrap_err().is_not_found());
    }

    #[test]
    fn duplicate_copies_everything_but_identity() {
        let mut db = test_db();
        let id = pale_ale(&mut db);
        let original = db.recipes().get(id).unwrap().unwrap();
        let before = quantities(&mut db, id);

        let copy_id = db.recipes().duplicate(id, "Pale Ale II").unwrap();
        assert_ne!(copy_id, id);

        let copy = db.recipes().get(copy_id).unwrap().unwrap();
        assert_eq!(copy.name, "Pale Ale II");
        assert_eq!(copy.parent_recipe_id, Some(id));
        assert_eq!(copy.version, 1);
        assert_eq!(copy.batch_size, original.batch_size);
        assert_eq!(copy.beverage_type, original.beverage_type);
        assert_eq!(quantities(&mut db, copy_id), before);

        let original_rows = db.recipe_ingredients().rows(id).unwrap();
        let copied_rows = db.recipe_ingredients().rows(copy_id).unwrap();
        for (o, c) in original_rows.iter().zip(&copied_rows) {
            assert_ne!(o.id, c.id);
            assert_eq!(c.recipe_id, copy_id);
            assert_eq!(o.process_step, c.process_step);
            assert_eq!(o.estimated_cost, c.estimated_cost);
        }

        assert_eq!(db.recipes().get(id).unwrap().unwrap(), original);
        assert_eq!(quantities(&mut db, id), before);
    }

    #[test]
    fn duplicate_of_missing_recipe() {
        let mut db = test_db();
        let err = db.recipes().duplicate(RecipeId::from(5), "X").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(db.recipes().count().unwrap(), 0);
    }

    #[test]
    fn scale_to_same_size_keeps_quantities_and_cost() {
        let mut db = test_db();
        let id = pale_ale(&mut db);
        let scaled = db.recipes().scale(id, 5.0).unwrap();
        assert_eq!(quantities(&mut db, scaled), quantities(&mut db, id));
        assert_eq!(
            db.recipes().calculate_cost(scaled).unwrap(),
            db.recipes().calculate_cost(id).unwrap()
        );
    }

    #[test]
    fn scale_multiplies_quantities_and_contributions() {
        let mut db = test_db();
        let id = pale_ale(&mut db);
        for factor in [0.5, 2.0, 3.3] {
            let scaled = db.recipes().scale(id, 5.0 * factor).unwrap();
            let recipe = db.recipes().get(scaled).unwrap().unwrap();
            assert!((recipe.batch_size - 5.0 * factor).abs() < EPSILON);
            assert_eq!(recipe.parent_recipe_id, Some(id));
            assert!(recipe.name.starts_with("Pale Ale (scaled to "));

            let original = db.recipe_ingredients().rows(id).unwrap();
            let copies = db.recipe_ingredients().rows(scaled).unwrap();
            assert_eq!(original.len(), copies.len());
            for (o, c) in original.iter().zip(&copies) {
                assert!((c.quantity - o.quantity * factor).abs() < EPSILON);
                let scaled_field = |v: Option<f64>| v.map(|v| v * factor);
                let close = |a: Option<f64>, b: Option<f64>| match (a, b) {
                    (Some(a), Some(b)) => (a - b).abs() < EPSILON,
                    (None, None) => true,
                    _ => false,
                };
                assert!(close(c.gravity_contribution, scaled_field(o.gravity_contribution)));
                assert!(close(
                    c.bitterness_contribution,
                    scaled_field(o.bitterness_contribution)
                ));
                assert!(close(c.estimated_cost, scaled_field(o.estimated_cost)));
            }
        }
    }

    #[test]
    fn scale_five_to_ten_gallons() {
        let mut db = test_db();
        let honey = honey(&mut db);
        let id = db
            .recipes()
            .create_with_ingredients(
                NewRecipe::new("Show Mead", BeverageType::Mead, 5.0),
                vec![usage(honey, 2.5, "fermentation")],
            )
            .unwrap();
        let scaled = db.recipes().scale(id, 10.0).unwrap();
        assert_eq!(db.recipes().get(scaled).unwrap().unwrap().batch_size, 10.0);
        assert_eq!(
            quantities(&mut db, scaled),
            vec![("Wildflower Honey".to_string(), 5.0, "pounds".to_string())]
        );
    }

    #[test]
    fn scale_compounds_from_the_immediate_source() {
        let mut db = test_db();
        let honey = honey(&mut db);
        let id = db
            .recipes()
            .create_with_ingredients(
                NewRecipe::new("Show Mead", BeverageType::Mead, 5.0),
                vec![usage(honey, 2.5, "fermentation")],
            )
            .unwrap();
        let doubled = db.recipes().scale(id, 10.0).unwrap();
        let mut edits: Vec<_> = db
            .recipe_ingredients()
            .rows(doubled)
            .unwrap()
            .iter()
            .map(RecipeIngredientEdit::from_row)
            .collect();
        edits[0].quantity = 6.0;
        db.recipe_ingredients().replace_all(doubled, edits).unwrap();

        let again = db.recipes().scale(doubled, 20.0).unwrap();
        assert_eq!(db.recipe_ingredients().rows(again).unwrap()[0].quantity, 12.0);
    }

    #[test]
    fn scale_rejects_bad_sizes() {
        let mut db = test_db();
        let id = pale_ale(&mut db);
        for target in [0.0, -5.0, f64::NAN] {
            let err = db.recipes().scale(id, target).unwrap_err();
            assert!(matches!(err, RepositoryError::InvalidArgument(_)));
        }
        assert!(db.recipes().scale(RecipeId::from(99), 5.0).unwrap_err().is_not_found());
        assert_eq!(db.recipes().count().unwrap(), 1);
    }

    #[test]
    fn scale_clears_actual_cost() {
        let mut db = test_db();
        let id = pale_ale(&mut db);
        db.recipes().reconcile_actual_cost(id, 30.0).unwrap();
        let scaled = db.recipes().scale(id, 10.0).unwrap();
        assert_eq!(db.recipe_ingredients().totals(scaled).unwrap().actual_cost, None);
    }

    #[test]
    fn variations_number_the_family() {
        let mut db = test_db();
        let root = pale_ale(&mut db);
        let v2 = db.recipes().create_variation(root, "more hops").unwrap();
        let v3 = db.recipes().create_variation(v2, "less malt").unwrap();
        let v4 = db.recipes().create_variation(root, "  swap yeast ").unwrap();

        let second = db.recipes().get(v2).unwrap().unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.parent_recipe_id, Some(root));
        assert_eq!(second.notes, "v2: more hops");
        assert_eq!(second.name, "Pale Ale (v2)");

        let third = db.recipes().get(v3).unwrap().unwrap();
        assert_eq!(third.version, 3);
        assert_eq!(third.parent_recipe_id, Some(root));
        assert_eq!(third.notes, "v2: more hops\nv3: less malt");

        let fourth = db.recipes().get(v4).unwrap().unwrap();
        assert_eq!(fourth.version, 4);
        assert_eq!(fourth.notes, "v4: swap yeast");
        assert_eq!(quantities(&mut db, v4), quantities(&mut db, root));

        let family: Vec<_> = db
            .recipes()
            .variations(root)
            .unwrap()
            .into_iter()
            .map(|r| r.version)
            .collect();
        assert_eq!(family, vec![2, 3, 4]);
    }

    #[test]
    fn variation_counts_versions_below_scaled_copies() {
        let mut db = test_db();
        let root = pale_ale(&mut db);
        let scaled = db.recipes().scale(root, 10.0).unwrap();
        let deep = db.recipes().create_variation(scaled, "big batch tweak").unwrap();
        let deep_recipe = db.recipes().get(deep).unwrap().unwrap();
        assert_eq!(deep_recipe.version, 2);
        assert_eq!(deep_recipe.parent_recipe_id, Some(root));
        assert_eq!(db.recipe_ingredients().rows(deep).unwrap()[0].quantity, 20.0);

        let next = db.recipes().create_variation(root, "again").unwrap();
        assert_eq!(db.recipes().get(next).unwrap().unwrap().version, 3);
    }

    #[test]
    fn set_parent_rejects_cycles() {
        let mut db = test_db();
        let a = pale_ale(&mut db);
        let b = db.recipes().duplicate(a, "B").unwrap();
        let c = db.recipes().duplicate(b, "C").unwrap();

        for (child, parent) in [(a, c), (a, b), (b, b)] {
            let err = db.recipes().set_parent(child, Some(parent)).unwrap_err();
            assert!(matches!(err, RepositoryError::InvalidArgument(_)), "{err}");
        }

        let lineage: Vec<_> = db
            .recipes()
            .lineage(c)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(lineage, vec![c, b, a]);

        db.recipes().set_parent(c, Some(a)).unwrap();
        db.recipes().set_parent(b, None).unwrap();
        db.recipes().set_parent(b, Some(c)).unwrap();
        let lineage: Vec<_> = db
            .recipes()
            .lineage(b)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(lineage, vec![b, c, a]);
    }

    #[test]
    fn update_rejects_cyclic_parent() {
        let mut db = test_db();
        let a = pale_ale(&mut db);
        let b = db.recipes().duplicate(a, "B").unwrap();
        let mut root = db.recipes().get(a).unwrap().unwrap();
        root.parent_recipe_id = Some(b);
        let err = db.recipes().update(root).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidArgument(_)));
    }

    #[test]
    fn cost_is_use_level_data() {
        let mut db = test_db();
        let honey = honey(&mut db);
        let id = db
            .recipes()
            .create_with_ingredients(
                NewRecipe::new("Mead", BeverageType::Mead, 5.0),
                vec![usage(honey, 3.0, "fermentation")],
            )
            .unwrap();
        assert_eq!(db.recipes().calculate_cost(id).unwrap(), None);

        let mut catalog_entry = db.ingredients().get(honey).unwrap().unwrap();
        catalog_entry.cost_per_unit = Some(8.0);
        db.ingredients().update(catalog_entry).unwrap();
        assert_eq!(db.recipes().calculate_cost(id).unwrap(), None);

        let mut edits: Vec<_> = db
            .recipe_ingredients()
            .rows(id)
            .unwrap()
            .iter()
            .map(RecipeIngredientEdit::from_row)
            .collect();
        edits[0].estimated_cost = Some(24.0);
        db.recipe_ingredients().replace_all(id, edits).unwrap();
        assert_eq!(db.recipes().calculate_cost(id).unwrap(), Some(24.0));
    }

    #[test]
    fn reconcile_distributes_proportionally() {
        let mut db = test_db();
        let id = pale_ale(&mut db);
        db.recipes().reconcile_actual_cost(id, 30.0).unwrap();

        let actual: Vec<_> = db
            .recipe_ingredients()
            .rows(id)
            .unwrap()
            .into_iter()
            .map(|r| r.actual_cost.unwrap())
            .collect();
        assert!((actual[0] - 22.5).abs() < EPSILON);
        assert!((actual[1] - 7.5).abs() < EPSILON);
        let total = db.recipe_ingredients().totals(id).unwrap().actual_cost.unwrap();
        assert!((total - 30.0).abs() < EPSILON);

        let err = db.recipes().reconcile_actual_cost(id, -1.0).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidArgument(_)));
    }

    #[test]
    fn reconcile_without_estimate_is_a_no_op() {
        let mut db = test_db();
        let honey = honey(&mut db);
        let id = db
            .recipes()
            .create_with_ingredients(
                NewRecipe::new("Mead", BeverageType::Mead, 5.0),
                vec![usage(honey, 3.0, "fermentation")],
            )
            .unwrap();
        db.recipes().reconcile_actual_cost(id, 40.0).unwrap();
        assert_eq!(db.recipe_ingredients().totals(id).unwrap().actual_cost, None);
    }
}
