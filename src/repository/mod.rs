// Copyright 2023 Remi Bernotavicius

mod ingredient;
mod recipe;
mod recipe_ingredient;

pub use ingredient::{rank_substitutes, ImportSummary, IngredientFilter, IngredientRepository};
pub use recipe::{RecipeQuery, RecipeRepository};
pub use recipe_ingredient::{
    BrewingSequence, ContributionTotals, RecipeIngredientEdit, RecipeIngredientRepository,
};

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// Search text lowercased once, matched against fields folded the same way.
struct Needle(String);

impl Needle {
    fn new(text: &str) -> Self {
        Self(text.to_lowercase())
    }

    fn found_in(&self, field: &str) -> bool {
        field.to_lowercase().contains(&self.0)
    }

    fn starts(&self, field: &str) -> bool {
        field.to_lowercase().starts_with(&self.0)
    }
}

#[test]
fn needles_fold_unicode_case() {
    let needle = Needle::new("MÄRZEN");
    assert!(needle.found_in("Oktoberfest Märzen"));
    assert!(needle.starts("märzen lager"));
    assert!(!needle.starts("Oktoberfest Märzen"));

    let needle = Needle::new("100%");
    assert!(needle.found_in("100% Brett"));
    assert!(!needle.found_in("1000 IBU"));
    assert!(Needle::new("").found_in("anything"));
}
