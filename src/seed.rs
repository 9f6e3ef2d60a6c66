// Copyright 2023 Remi Bernotavicius

//! The starter ingredient catalog loaded into a fresh database.

use crate::database::models::{Ingredient, IngredientCategory, IngredientIdList};
use crate::database::Database;
use crate::error::Result;
use crate::repository::ImportSummary;

struct Entry {
    name: &'static str,
    category: IngredientCategory,
    description: &'static str,
    flavor_intensity: i32,
    available: bool,
    substitutes_for: &'static [i32],
    ratio: Option<f64>,
}

const fn entry(
    name: &'static str,
    category: IngredientCategory,
    description: &'static str,
    flavor_intensity: i32,
) -> Entry {
    Entry {
        name,
        category,
        description,
        flavor_intensity,
        available: true,
        substitutes_for: &[],
        ratio: None,
    }
}

const fn subs(mut e: Entry, substitutes_for: &'static [i32], ratio: Option<f64>) -> Entry {
    e.substitutes_for = substitutes_for;
    e.ratio = ratio;
    e
}

const fn scarce(mut e: Entry) -> Entry {
    e.available = false;
    e
}

use IngredientCategory::*;

// Position in this list is the catalog id, starting at 1.
const CATALOG: &[Entry] = &[
    entry("Pale Malt", Grain, "Base malt for most ales", 2),
    subs(
        entry("Maris Otter", Grain, "Biscuity British base malt", 3),
        &[1],
        None,
    ),
    subs(
        entry("Pilsner Malt", Grain, "Light continental base malt", 2),
        &[1],
        None,
    ),
    entry("Crystal 60L", Grain, "Caramel sweetness and amber color", 3),
    entry("Chocolate Malt", Grain, "Roasted cocoa notes", 4),
    subs(
        entry("Light DME", Extract, "Dried malt extract", 2),
        &[1],
        Some(0.6),
    ),
    entry("Cascade", Hops, "Floral grapefruit aroma hop", 3),
    subs(
        entry("Centennial", Hops, "Citrus bittering and aroma hop", 4),
        &[7],
        Some(0.8),
    ),
    subs(
        entry("Citra", Hops, "Intense tropical fruit aroma", 5),
        &[7, 8],
        Some(0.75),
    ),
    entry("Saaz", Hops, "Spicy noble hop", 2),
    subs(
        entry("Hallertau", Hops, "Mild herbal noble hop", 2),
        &[10],
        None,
    ),
    entry("US-05", Yeast, "Clean American ale yeast", 2),
    entry("EC-1118", Yeast, "Champagne yeast for wine and mead", 1),
    subs(
        entry("71B", Yeast, "Fruity wine yeast that softens acidity", 2),
        &[13],
        None,
    ),
    entry("Wildflower Honey", Honey, "All-purpose mead honey", 3),
    subs(
        entry("Orange Blossom Honey", Honey, "Light citrus floral honey", 3),
        &[15],
        Some(1.0),
    ),
    subs(
        entry("Clover Honey", Honey, "Mild everyday honey", 2),
        &[15],
        Some(1.0),
    ),
    scarce(subs(
        entry("Buckwheat Honey", Honey, "Dark malty honey", 5),
        &[15],
        Some(0.9),
    )),
    subs(
        entry("Cane Sugar", Sugar, "Neutral fermentable sugar", 1),
        &[15],
        Some(0.8),
    ),
    subs(
        entry("Corn Sugar", Sugar, "Dextrose for priming", 1),
        &[19],
        None,
    ),
    entry("Apple Juice", Juice, "Fresh pressed cider base", 3),
    subs(
        entry("Pear Juice", Juice, "Perry base", 3),
        &[21],
        None,
    ),
    entry("Raspberries", Fruit, "Tart red berries", 4),
    subs(
        entry("Blackberries", Fruit, "Deep jammy berries", 4),
        &[23],
        None,
    ),
    entry("Cinnamon", Spice, "Warm sweet spice", 4),
    scarce(entry("Vanilla Beans", Spice, "Creamy aromatic pods", 3)),
    entry("Black Tea", Tea, "Classic kombucha tea base", 3),
    subs(
        entry("Green Tea", Tea, "Lighter grassy tea base", 2),
        &[27],
        Some(1.2),
    ),
    entry("SCOBY", Culture, "Kombucha starter culture", 1),
    entry("Yeast Nutrient", Nutrient, "Keeps honey ferments healthy", 1),
];

pub fn builtin_catalog() -> Vec<Ingredient> {
    CATALOG
        .iter()
        .zip(1..)
        .map(|(e, id)| Ingredient {
            id: id.into(),
            name: e.name.into(),
            category: e.category,
            brand: None,
            supplier: None,
            description: e.description.into(),
            usage_notes: String::new(),
            typical_quantity_min: None,
            typical_quantity_max: None,
            flavor_intensity: e.flavor_intensity,
            cost_per_unit: None,
            is_commonly_available: e.available,
            substitutes_for: IngredientIdList(e.substitutes_for.iter().map(|&i| i.into()).collect()),
            substitution_ratio: e.ratio,
            is_deleted: false,
        })
        .collect()
}

/// Loads the starter catalog unless some ingredient was ever stored, soft-deleted ones
/// included, so deleting a seeded entry does not bring it back.
pub fn seed_catalog_if_empty(db: &mut Database) -> Result<Option<ImportSummary>> {
    if db.ingredients().stored_count()? > 0 {
        log::debug!("ingredient catalog already present");
        return Ok(None);
    }
    let summary = db
        .ingredients()
        .import_ingredients(&builtin_catalog(), false)?;
    Ok(Some(summary))
}
