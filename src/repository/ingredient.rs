// Copyright 2023 Remi Bernotavicius

use super::Needle;
use crate::database::models::{
    BeverageType, Ingredient, IngredientCategory, IngredientId, NewIngredient,
};
use crate::database::schema::ingredients;
use crate::database::watch::{Table, Watchable};
use crate::database::{self, Connection, Database};
use crate::error::{RepositoryError, Result};
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::NullableExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::cmp::Ordering;

/// Faceted catalog query. Every facet is optional and an absent bound leaves that side open.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngredientFilter {
    pub category: Option<IngredientCategory>,
    pub brand: Option<String>,
    pub supplier: Option<String>,
    pub commonly_available: Option<bool>,
    pub min_cost: Option<f64>,
    pub max_cost: Option<f64>,
    pub min_intensity: Option<i32>,
    pub max_intensity: Option<i32>,
}

impl IngredientFilter {
    pub fn category(category: IngredientCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    fn has_cost_bound(&self) -> bool {
        self.min_cost.is_some() || self.max_cost.is_some()
    }
}

impl Watchable for IngredientFilter {
    type Item = Ingredient;

    fn tables(&self) -> &'static [Table] {
        &[Table::Ingredients]
    }

    fn load(&self, db: &mut Database) -> Result<Vec<Ingredient>> {
        db.ingredients().filter(self)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Orders substitution candidates for `original`, best first, dropping any that do not
/// apply to `beverage`. Ties fall through availability (when preferred), then the lower
/// substitution ratio, then the closer flavor intensity, then the name.
pub fn rank_substitutes(
    original: &Ingredient,
    candidates: Vec<Ingredient>,
    beverage: BeverageType,
    prefer_available: bool,
) -> Vec<Ingredient> {
    let intensity_gap = |i: &Ingredient| (i.flavor_intensity - original.flavor_intensity).abs();
    let mut ranked: Vec<Ingredient> = candidates
        .into_iter()
        .filter(|c| c.id != original.id)
        .filter(|c| c.substitutes_for.contains(original.id))
        .filter(|c| c.applies_to(beverage))
        .collect();
    ranked.sort_by(|a, b| {
        let availability = if prefer_available {
            b.is_commonly_available.cmp(&a.is_commonly_available)
        } else {
            Ordering::Equal
        };
        availability
            .then_with(|| {
                a.effective_substitution_ratio()
                    .total_cmp(&b.effective_substitution_ratio())
            })
            .then_with(|| intensity_gap(a).cmp(&intensity_gap(b)))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked
}

fn validate_fields(name: &str, flavor_intensity: i32, cost_per_unit: Option<f64>) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RepositoryError::invalid("ingredient name must not be empty"));
    }
    if !(1..=5).contains(&flavor_intensity) {
        return Err(RepositoryError::invalid(format!(
            "flavor intensity must be between 1 and 5, got {flavor_intensity}"
        )));
    }
    if let Some(cost) = cost_per_unit {
        if !(cost.is_finite() && cost >= 0.0) {
            return Err(RepositoryError::invalid(format!(
                "cost per unit must be a non-negative amount, got {cost}"
            )));
        }
    }
    Ok(())
}

fn find_stored(conn: &mut Connection, id: IngredientId) -> Result<Option<Ingredient>> {
    Ok(ingredients::table
        .find(id)
        .select(Ingredient::as_select())
        .first(conn)
        .optional()?)
}

fn find_active(conn: &mut Connection, id: IngredientId) -> Result<Option<Ingredient>> {
    Ok(find_stored(conn, id)?.filter(|i| !i.is_deleted))
}

fn require_active(conn: &mut Connection, id: IngredientId) -> Result<Ingredient> {
    find_active(conn, id)?.ok_or(RepositoryError::ingredient_not_found(id))
}

pub struct IngredientRepository<'db> {
    db: &'db mut Database,
}

impl<'db> IngredientRepository<'db> {
    pub(crate) fn new(db: &'db mut Database) -> Self {
        Self { db }
    }

    pub fn create(&mut self, new_ingredient: NewIngredient) -> Result<IngredientId> {
        validate_fields(
            &new_ingredient.name,
            new_ingredient.flavor_intensity,
            new_ingredient.cost_per_unit,
        )?;
        let id = self.db.write(&[Table::Ingredients], |conn| {
            diesel::insert_into(ingredients::table)
                .values(&new_ingredient)
                .execute(conn)?;
            Ok(IngredientId::from(database::last_insert_rowid(conn)?))
        })?;
        log::info!("created ingredient {id} {:?}", new_ingredient.name);
        Ok(id)
    }

    /// Returns `None` for absent and soft-deleted ingredients.
    pub fn get(&mut self, id: IngredientId) -> Result<Option<Ingredient>> {
        find_active(self.db.connection(), id)
    }

    pub fn update(&mut self, ingredient: Ingredient) -> Result<()> {
        validate_fields(
            &ingredient.name,
            ingredient.flavor_intensity,
            ingredient.cost_per_unit,
        )?;
        self.db.write(&[Table::Ingredients], |conn| {
            require_active(conn, ingredient.id)?;
            diesel::update(&ingredient).set(&ingredient).execute(conn)?;
            Ok(())
        })?;
        log::info!("updated ingredient {}", ingredient.id);
        Ok(())
    }

    /// Case-insensitive substring search over name, description and brand. Names starting
    /// with `text` come first, then alphabetical.
    pub fn search(&mut self, text: &str) -> Result<Vec<Ingredient>> {
        let needle = Needle::new(text);
        let mut found: Vec<Ingredient> = ingredients::table
            .filter(ingredients::is_deleted.eq(false))
            .select(Ingredient::as_select())
            .load::<Ingredient>(self.db.connection())?
            .into_iter()
            .filter(|i| {
                needle.found_in(&i.name)
                    || needle.found_in(&i.description)
                    || i.brand.as_deref().is_some_and(|b| needle.found_in(b))
            })
            .collect();
        found.sort_by_cached_key(|i| (!needle.starts(&i.name), i.name.to_lowercase(), i.id));
        log::debug!("ingredient search {text:?} matched {}", found.len());
        Ok(found)
    }

    pub fn filter(&mut self, filter: &IngredientFilter) -> Result<Vec<Ingredient>> {
        let mut query = ingredients::table
            .select(Ingredient::as_select())
            .filter(ingredients::is_deleted.eq(false))
            .into_boxed();

        if let Some(category) = filter.category {
            query = query.filter(ingredients::category.eq(category));
        }
        if let Some(brand) = &filter.brand {
            query = query.filter(ingredients::brand.assume_not_null().eq(brand.clone()));
        }
        if let Some(supplier) = &filter.supplier {
            query = query.filter(ingredients::supplier.assume_not_null().eq(supplier.clone()));
        }
        if let Some(available) = filter.commonly_available {
            query = query.filter(ingredients::is_commonly_available.eq(available));
        }
        if filter.has_cost_bound() {
            query = query.filter(ingredients::cost_per_unit.is_not_null());
        }
        if let Some(min) = filter.min_cost {
            query = query.filter(ingredients::cost_per_unit.assume_not_null().ge(min));
        }
        if let Some(max) = filter.max_cost {
            query = query.filter(ingredients::cost_per_unit.assume_not_null().le(max));
        }
        if let Some(min) = filter.min_intensity {
            query = query.filter(ingredients::flavor_intensity.ge(min));
        }
        if let Some(max) = filter.max_intensity {
            query = query.filter(ingredients::flavor_intensity.le(max));
        }

        let found: Vec<Ingredient> = query
            .order((ingredients::name.asc(), ingredients::id.asc()))
            .load(self.db.connection())?;
        log::debug!("{filter:?} matched {} ingredients", found.len());
        Ok(found)
    }

    pub fn by_category(&mut self, category: IngredientCategory) -> Result<Vec<Ingredient>> {
        self.filter(&IngredientFilter::category(category))
    }

    pub fn by_brand(&mut self, brand: &str) -> Result<Vec<Ingredient>> {
        self.filter(&IngredientFilter {
            brand: Some(brand.into()),
            ..IngredientFilter::default()
        })
    }

    pub fn by_supplier(&mut self, supplier: &str) -> Result<Vec<Ingredient>> {
        self.filter(&IngredientFilter {
            supplier: Some(supplier.into()),
            ..IngredientFilter::default()
        })
    }

    pub fn commonly_available(&mut self) -> Result<Vec<Ingredient>> {
        self.filter(&IngredientFilter {
            commonly_available: Some(true),
            ..IngredientFilter::default()
        })
    }

    pub fn applicable_to(&mut self, beverage: BeverageType) -> Result<Vec<Ingredient>> {
        let mut found = self.filter(&IngredientFilter::default())?;
        found.retain(|i| i.applies_to(beverage));
        Ok(found)
    }

    /// Every candidate that lists `original_id` as something it can replace, best first.
    pub fn substitutes(
        &mut self,
        original_id: IngredientId,
        beverage: BeverageType,
        prefer_available: bool,
    ) -> Result<Vec<Ingredient>> {
        let conn = self.db.connection();
        let original =
            find_stored(conn, original_id)?.ok_or(RepositoryError::ingredient_not_found(original_id))?;
        let candidates: Vec<Ingredient> = ingredients::table
            .filter(ingredients::is_deleted.eq(false))
            .filter(ingredients::substitutes_for.ne(""))
            .select(Ingredient::as_select())
            .load(conn)?;
        Ok(rank_substitutes(
            &original,
            candidates,
            beverage,
            prefer_available,
        ))
    }

    pub fn find_substitute(
        &mut self,
        original_id: IngredientId,
        beverage: BeverageType,
        prefer_available: bool,
    ) -> Result<Option<Ingredient>> {
        let best = self
            .substitutes(original_id, beverage, prefer_available)?
            .into_iter()
            .next();
        log::debug!(
            "substitute for {original_id} in {beverage}: {:?}",
            best.as_ref().map(|i| &i.name)
        );
        Ok(best)
    }

    pub fn soft_delete(&mut self, id: IngredientId) -> Result<()> {
        self.db.write(&[Table::Ingredients], |conn| {
            require_active(conn, id)?;
            diesel::update(ingredients::table.find(id))
                .set(ingredients::is_deleted.eq(true))
                .execute(conn)?;
            Ok(())
        })?;
        log::info!("soft-deleted ingredient {id}");
        Ok(())
    }

    /// Removes the ingredient row and every recipe usage of it.
    pub fn hard_delete(&mut self, id: IngredientId) -> Result<()> {
        self.db
            .write(&[Table::Ingredients, Table::RecipeIngredients], |conn| {
                let deleted = diesel::delete(ingredients::table.find(id)).execute(conn)?;
                if deleted == 0 {
                    return Err(RepositoryError::ingredient_not_found(id));
                }
                Ok(())
            })?;
        log::info!("deleted ingredient {id}");
        Ok(())
    }

    pub fn count(&mut self) -> Result<usize> {
        let count: i64 = ingredients::table
            .filter(ingredients::is_deleted.eq(false))
            .count()
            .get_result(self.db.connection())?;
        Ok(count as usize)
    }

    /// Number of stored ingredient rows, soft-deleted ones included.
    pub fn stored_count(&mut self) -> Result<usize> {
        let count: i64 = ingredients::table
            .count()
            .get_result(self.db.connection())?;
        Ok(count as usize)
    }

    /// Loads catalog records that carry their own ids. With `replace_existing` a record
    /// overwrites the stored one of the same id, otherwise that record is skipped. Runs as
    /// one transaction.
    pub fn import_ingredients(
        &mut self,
        records: &[Ingredient],
        replace_existing: bool,
    ) -> Result<ImportSummary> {
        for record in records {
            validate_fields(&record.name, record.flavor_intensity, record.cost_per_unit)?;
        }
        let summary = self.db.write(&[Table::Ingredients], |conn| {
            let mut summary = ImportSummary::default();
            for record in records {
                let exists = find_stored(conn, record.id)?.is_some();
                if !exists {
                    diesel::insert_into(ingredients::table)
                        .values(record)
                        .execute(conn)?;
                    summary.inserted += 1;
                } else if replace_existing {
                    // An UPDATE keeps the recipe usages that a REPLACE would cascade away.
                    diesel::update(record).set(record).execute(conn)?;
                    summary.updated += 1;
                } else {
                    summary.skipped += 1;
                }
            }
            Ok(summary)
        })?;
        log::info!(
            "imported ingredients: {} inserted, {} updated, {} skipped",
            summary.inserted,
            summary.updated,
            summary.skipped
        );
        Ok(summary)
    }
}
