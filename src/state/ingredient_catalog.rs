// Copyright 2023 Remi Bernotavicius

use super::report;
use crate::database::models::{BeverageType, Ingredient, IngredientId};
use crate::database::watch::LiveQuery;
use crate::database::Database;
use crate::repository::IngredientFilter;

pub struct IngredientCatalog {
    ingredients: LiveQuery<IngredientFilter>,
    substitutes: Vec<Ingredient>,
    pub error_message: Option<String>,
}

impl IngredientCatalog {
    pub fn new(db: &mut Database) -> Self {
        let mut catalog = Self {
            ingredients: db.watch(IngredientFilter::default()),
            substitutes: vec![],
            error_message: None,
        };
        catalog.refresh(db);
        catalog
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        self.ingredients.snapshot()
    }

    pub fn filter(&self) -> &IngredientFilter {
        self.ingredients.query()
    }

    pub fn set_filter(&mut self, db: &mut Database, filter: IngredientFilter) {
        self.ingredients.set_query(filter);
        self.refresh(db);
    }

    pub fn refresh(&mut self, db: &mut Database) -> bool {
        let result = self.ingredients.refresh(db);
        report(&mut self.error_message, result).unwrap_or(false)
    }

    pub fn substitutes(&self) -> &[Ingredient] {
        &self.substitutes
    }

    pub fn look_up_substitutes(
        &mut self,
        db: &mut Database,
        original: IngredientId,
        beverage: BeverageType,
        prefer_available: bool,
    ) {
        let result = db
            .ingredients()
            .substitutes(original, beverage, prefer_available);
        if let Some(found) = report(&mut self.error_message, result) {
            self.substitutes = found;
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error_message = None;
    }
}

#[test]
fn filtered_catalog_follows_writes() {
    use crate::database::models::IngredientCategory;
    use crate::seed;

    let mut db = Database::open_in_memory().unwrap();
    let mut catalog = IngredientCatalog::new(&mut db);
    assert!(catalog.ingredients().is_empty());

    seed::seed_catalog_if_empty(&mut db).unwrap();
    assert!(catalog.refresh(&mut db));
    assert_eq!(catalog.ingredients().len(), 30);

    catalog.set_filter(&mut db, IngredientFilter::category(IngredientCategory::Tea));
    let names: Vec<_> = catalog.ingredients().iter().map(|i| &i.name[..]).collect();
    assert_eq!(names, vec!["Black Tea", "Green Tea"]);

    db.ingredients().soft_delete(28.into()).unwrap();
    assert!(catalog.refresh(&mut db));
    assert_eq!(catalog.ingredients().len(), 1);
}

#[test]
fn substitute_lookup() {
    use crate::seed;

    let mut db = Database::open_in_memory().unwrap();
    seed::seed_catalog_if_empty(&mut db).unwrap();
    let mut catalog = IngredientCatalog::new(&mut db);

    catalog.look_up_substitutes(&mut db, 27.into(), BeverageType::Kombucha, true);
    assert_eq!(catalog.substitutes().len(), 1);
    assert_eq!(catalog.substitutes()[0].name, "Green Tea");

    catalog.look_up_substitutes(&mut db, 500.into(), BeverageType::Kombucha, true);
    assert_eq!(
        catalog.error_message.as_deref(),
        Some("ingredient 500 not found")
    );
    assert_eq!(catalog.substitutes()[0].name, "Green Tea");
    catalog.dismiss_error();
    assert_eq!(catalog.error_message, None);
}
