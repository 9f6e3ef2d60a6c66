// Copyright 2023 Remi Bernotavicius

use derive_more::Display;
use diesel::associations::{Associations, Identifiable};
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow, Queryable};
use diesel::expression::{AsExpression, Selectable};
use diesel::prelude::{AsChangeset, Insertable};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use diesel_derive_enum::DbEnum;
use diesel_derive_newtype::DieselNewType;
use std::fmt;
use std::str::FromStr;
use strum::{EnumIter, EnumString};

#[derive(
    DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone,
)]
pub struct RecipeId(i32);

impl RecipeId {
    pub fn get(&self) -> i32 {
        self.0
    }
}

impl From<i32> for RecipeId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

#[derive(
    DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone,
)]
pub struct IngredientId(i32);

impl IngredientId {
    pub fn get(&self) -> i32 {
        self.0
    }
}

impl From<i32> for IngredientId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

#[derive(
    DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone,
)]
pub struct RecipeIngredientId(i32);

impl RecipeIngredientId {
    pub fn get(&self) -> i32 {
        self.0
    }
}

impl From<i32> for RecipeIngredientId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

#[derive(
    Debug, Display, EnumIter, EnumString, Hash, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, DbEnum,
)]
#[strum(ascii_case_insensitive)]
pub enum BeverageType {
    #[display("Beer")]
    Beer,
    #[display("Wine")]
    Wine,
    #[display("Mead")]
    Mead,
    #[display("Cider")]
    Cider,
    #[display("Kombucha")]
    Kombucha,
    #[display("Specialty")]
    Specialty,
}

impl BeverageType {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

const EVERY_BEVERAGE: &[BeverageType] = &[
    BeverageType::Beer,
    BeverageType::Wine,
    BeverageType::Mead,
    BeverageType::Cider,
    BeverageType::Kombucha,
    BeverageType::Specialty,
];

#[derive(
    Debug, Display, EnumIter, EnumString, Hash, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, DbEnum,
)]
#[strum(ascii_case_insensitive)]
pub enum IngredientCategory {
    #[display("grain")]
    Grain,
    #[display("malt extract")]
    #[strum(serialize = "malt extract", serialize = "extract")]
    Extract,
    #[display("hops")]
    Hops,
    #[display("yeast")]
    Yeast,
    #[display("honey")]
    Honey,
    #[display("fruit")]
    Fruit,
    #[display("juice")]
    Juice,
    #[display("sugar")]
    Sugar,
    #[display("spice")]
    Spice,
    #[display("herb")]
    Herb,
    #[display("tea")]
    Tea,
    #[display("culture")]
    Culture,
    #[display("nutrient")]
    Nutrient,
    #[display("acid")]
    Acid,
    #[display("tannin")]
    Tannin,
    #[display("clarifier")]
    Clarifier,
    #[display("water agent")]
    #[strum(serialize = "water agent", serialize = "wateragent")]
    WaterAgent,
    #[display("other")]
    Other,
}

impl IngredientCategory {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }

    pub fn applicable_beverages(&self) -> &'static [BeverageType] {
        use BeverageType::*;
        match self {
            Self::Grain => &[Beer, Specialty],
            Self::Extract => &[Beer],
            Self::Hops => &[Beer, Mead, Cider, Specialty],
            Self::Yeast => &[Beer, Wine, Mead, Cider, Specialty],
            Self::Honey => &[Mead, Beer, Cider, Kombucha, Specialty],
            Self::Juice => &[Wine, Cider, Mead, Kombucha, Specialty],
            Self::Tea => &[Kombucha, Mead, Specialty],
            Self::Culture => &[Kombucha],
            Self::Nutrient => &[Beer, Wine, Mead, Cider, Specialty],
            Self::Acid => &[Wine, Mead, Cider, Specialty],
            Self::Tannin => &[Wine, Mead, Cider],
            Self::Clarifier => &[Beer, Wine, Mead, Cider, Specialty],
            Self::WaterAgent => &[Beer, Specialty],
            Self::Fruit | Self::Sugar | Self::Spice | Self::Herb | Self::Other => EVERY_BEVERAGE,
        }
    }

    pub fn applies_to(&self, beverage: BeverageType) -> bool {
        self.applicable_beverages().contains(&beverage)
    }

    pub fn default_unit(&self) -> &'static str {
        match self {
            Self::Grain | Self::Extract | Self::Honey | Self::Fruit | Self::Sugar => "pounds",
            Self::Hops | Self::Spice | Self::Herb => "ounces",
            Self::Yeast => "packets",
            Self::Juice => "gallons",
            Self::Tea | Self::WaterAgent => "grams",
            Self::Nutrient | Self::Acid | Self::Tannin | Self::Clarifier => "teaspoons",
            Self::Culture | Self::Other => "each",
        }
    }
}

/// The ingredients a catalog entry can stand in for, stored as comma-separated ids.
#[derive(AsExpression, FromSqlRow, Debug, Default, Clone, PartialEq, Eq)]
#[diesel(sql_type = Text)]
pub struct IngredientIdList(pub Vec<IngredientId>);

impl IngredientIdList {
    pub fn contains(&self, id: IngredientId) -> bool {
        self.0.contains(&id)
    }
}

impl From<Vec<IngredientId>> for IngredientIdList {
    fn from(ids: Vec<IngredientId>) -> Self {
        Self(ids)
    }
}

impl fmt::Display for IngredientIdList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

impl FromStr for IngredientIdList {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<i32>().map(IngredientId::from))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl ToSql<Text, Sqlite> for IngredientIdList {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.to_string());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for IngredientIdList {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(text.parse()?)
    }
}

#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub description: String,
    pub beverage_type: BeverageType,
    pub batch_size: f64,
    pub batch_unit: String,
    pub original_gravity: Option<f64>,
    pub final_gravity: Option<f64>,
    pub abv: Option<f64>,
    pub difficulty: i32,
    pub brew_time_minutes: Option<i32>,
    pub fermentation_days: Option<i32>,
    pub conditioning_days: Option<i32>,
    pub instructions: String,
    pub notes: String,
    pub version: i32,
    pub parent_recipe_id: Option<RecipeId>,
    pub is_favorite: bool,
    pub is_deleted: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl Recipe {
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.batch_size > 0.0
    }
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct NewRecipe {
    pub name: String,
    pub description: String,
    pub beverage_type: BeverageType,
    pub batch_size: f64,
    pub batch_unit: String,
    pub original_gravity: Option<f64>,
    pub final_gravity: Option<f64>,
    pub abv: Option<f64>,
    pub difficulty: i32,
    pub brew_time_minutes: Option<i32>,
    pub fermentation_days: Option<i32>,
    pub conditioning_days: Option<i32>,
    pub instructions: String,
    pub notes: String,
    pub version: i32,
    pub parent_recipe_id: Option<RecipeId>,
    pub is_favorite: bool,
}

impl NewRecipe {
    pub fn new(name: impl Into<String>, beverage_type: BeverageType, batch_size: f64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            beverage_type,
            batch_size,
            batch_unit: "gallons".into(),
            original_gravity: None,
            final_gravity: None,
            abv: None,
            difficulty: 1,
            brew_time_minutes: None,
            fermentation_days: None,
            conditioning_days: None,
            instructions: String::new(),
            notes: String::new(),
            version: 1,
            parent_recipe_id: None,
            is_favorite: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.batch_size > 0.0
    }
}

impl From<&Recipe> for NewRecipe {
    fn from(r: &Recipe) -> Self {
        Self {
            name: r.name.clone(),
            description: r.description.clone(),
            beverage_type: r.beverage_type,
            batch_size: r.batch_size,
            batch_unit: r.batch_unit.clone(),
            original_gravity: r.original_gravity,
            final_gravity: r.final_gravity,
            abv: r.abv,
            difficulty: r.difficulty,
            brew_time_minutes: r.brew_time_minutes,
            fermentation_days: r.fermentation_days,
            conditioning_days: r.conditioning_days,
            instructions: r.instructions.clone(),
            notes: r.notes.clone(),
            version: r.version,
            parent_recipe_id: r.parent_recipe_id,
            is_favorite: r.is_favorite,
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::ingredients)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub category: IngredientCategory,
    pub brand: Option<String>,
    pub supplier: Option<String>,
    pub description: String,
    pub usage_notes: String,
    pub typical_quantity_min: Option<f64>,
    pub typical_quantity_max: Option<f64>,
    pub flavor_intensity: i32,
    pub cost_per_unit: Option<f64>,
    pub is_commonly_available: bool,
    pub substitutes_for: IngredientIdList,
    pub substitution_ratio: Option<f64>,
    pub is_deleted: bool,
}

impl Ingredient {
    pub fn applies_to(&self, beverage: BeverageType) -> bool {
        self.category.applies_to(beverage)
    }

    /// Amount of this ingredient used per unit of the one it replaces.
    pub fn effective_substitution_ratio(&self) -> f64 {
        self.substitution_ratio.unwrap_or(1.0)
    }
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct NewIngredient {
    pub name: String,
    pub category: IngredientCategory,
    pub brand: Option<String>,
    pub supplier: Option<String>,
    pub description: String,
    pub usage_notes: String,
    pub typical_quantity_min: Option<f64>,
    pub typical_quantity_max: Option<f64>,
    pub flavor_intensity: i32,
    pub cost_per_unit: Option<f64>,
    pub is_commonly_available: bool,
    pub substitutes_for: IngredientIdList,
    pub substitution_ratio: Option<f64>,
}

impl NewIngredient {
    pub fn new(name: impl Into<String>, category: IngredientCategory) -> Self {
        Self {
            name: name.into(),
            category,
            brand: None,
            supplier: None,
            description: String::new(),
            usage_notes: String::new(),
            typical_quantity_min: None,
            typical_quantity_max: None,
            flavor_intensity: 3,
            cost_per_unit: None,
            is_commonly_available: true,
            substitutes_for: IngredientIdList::default(),
            substitution_ratio: None,
        }
    }
}

#[derive(
    Associations, Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, PartialEq,
)]
#[diesel(belongs_to(Recipe))]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct RecipeIngredient {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
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
    pub actual_cost: Option<f64>,
    pub notes: String,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct NewRecipeIngredient {
    pub recipe_id: RecipeId,
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
    pub actual_cost: Option<f64>,
    pub notes: String,
}

impl NewRecipeIngredient {
    pub fn copy_of(usage: &RecipeIngredient, recipe_id: RecipeId) -> Self {
        Self {
            recipe_id,
            ingredient_id: usage.ingredient_id,
            quantity: usage.quantity,
            unit: usage.unit.clone(),
            process_step: usage.process_step.clone(),
            addition_time_minutes: usage.addition_time_minutes,
            duration_minutes: usage.duration_minutes,
            substitute_ingredient_id: usage.substitute_ingredient_id,
            is_optional: usage.is_optional,
            is_critical_timing: usage.is_critical_timing,
            priority: usage.priority,
            gravity_contribution: usage.gravity_contribution,
            bitterness_contribution: usage.bitterness_contribution,
            color_contribution: usage.color_contribution,
            estimated_cost: usage.estimated_cost,
            actual_cost: usage.actual_cost,
            notes: usage.notes.clone(),
        }
    }

    /// Multiplies the quantity and every derived contribution by `factor`.
    /// Actual cost belongs to a brewed batch, so a scaled copy starts without one.
    pub fn scaled(mut self, factor: f64) -> Self {
        self.quantity *= factor;
        self.gravity_contribution = self.gravity_contribution.map(|v| v * factor);
        self.bitterness_contribution = self.bitterness_contribution.map(|v| v * factor);
        self.color_contribution = self.color_contribution.map(|v| v * factor);
        self.estimated_cost = self.estimated_cost.map(|v| v * factor);
        self.actual_cost = None;
        self
    }
}

#[test]
fn ingredient_id_list_text_form() {
    let list: IngredientIdList = "3, 7,,12".parse().unwrap();
    assert_eq!(
        list,
        IngredientIdList(vec![3.into(), 7.into(), 12.into()])
    );
    assert_eq!(list.to_string(), "3,7,12");
    assert!(list.contains(7.into()));
    assert!(!list.contains(4.into()));

    let empty: IngredientIdList = "".parse().unwrap();
    assert!(empty.0.is_empty());
    assert_eq!(empty.to_string(), "");

    assert!("3,x".parse::<IngredientIdList>().is_err());
}

#[test]
fn category_applicability() {
    assert!(IngredientCategory::Culture.applies_to(BeverageType::Kombucha));
    assert!(!IngredientCategory::Culture.applies_to(BeverageType::Beer));
    assert!(!IngredientCategory::Grain.applies_to(BeverageType::Mead));
    for beverage in BeverageType::iter() {
        assert!(IngredientCategory::Fruit.applies_to(beverage));
    }
    for category in IngredientCategory::iter() {
        assert!(!category.applicable_beverages().is_empty());
        assert!(!category.default_unit().is_empty());
    }
}

#[test]
fn beverage_type_parses_case_insensitively() {
    assert_eq!("mead".parse::<BeverageType>().unwrap(), BeverageType::Mead);
    assert_eq!("KOMBUCHA".parse::<BeverageType>().unwrap(), BeverageType::Kombucha);
    assert!("soda".parse::<BeverageType>().is_err());
    assert_eq!(BeverageType::Cider.to_string(), "Cider");
}

#[test]
fn ingredient_category_parses_its_display_name() {
    for category in IngredientCategory::iter() {
        assert_eq!(category.to_string().parse::<IngredientCategory>().unwrap(), category);
    }
    assert_eq!(
        "Malt Extract".parse::<IngredientCategory>().unwrap(),
        IngredientCategory::Extract
    );
    assert_eq!(
        "WaterAgent".parse::<IngredientCategory>().unwrap(),
        IngredientCategory::WaterAgent
    );
}

#[test]
fn scaling_a_usage_row() {
    let usage = NewRecipeIngredient {
        recipe_id: 1.into(),
        ingredient_id: 2.into(),
        quantity: 2.5,
        unit: "pounds".into(),
        process_step: "boil".into(),
        addition_time_minutes: 60,
        duration_minutes: None,
        substitute_ingredient_id: None,
        is_optional: false,
        is_critical_timing: true,
        priority: 0,
        gravity_contribution: Some(10.0),
        bitterness_contribution: None,
        color_contribution: Some(2.0),
        estimated_cost: Some(4.0),
        actual_cost: Some(4.5),
        notes: String::new(),
    };
    let scaled = usage.scaled(2.0);
    assert_eq!(scaled.quantity, 5.0);
    assert_eq!(scaled.gravity_contribution, Some(20.0));
    assert_eq!(scaled.bitterness_contribution, None);
    assert_eq!(scaled.color_contribution, Some(4.0));
    assert_eq!(scaled.estimated_cost, Some(8.0));
    assert_eq!(scaled.actual_cost, None);
    assert_eq!(scaled.unit, "pounds");
}
