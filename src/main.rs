// Copyright 2023 Remi Bernotavicius

use brewbook::repository::{IngredientFilter, RecipeQuery};
use brewbook::{BeverageType, Database, Ingredient, IngredientCategory, Recipe, RecipeId};
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
#[command(name = "brewbook", about = "Homebrew recipe book")]
struct Args {
    /// Database file to use instead of the one in the user data directory
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log more, repeat for even more
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load the starter ingredient catalog into an empty database
    Seed,
    List {
        #[arg(long = "type")]
        beverage_type: Option<BeverageType>,
        #[arg(long)]
        favorites: bool,
        #[arg(long)]
        recent: Option<usize>,
    },
    Search {
        text: String,
    },
    Show {
        id: i32,
    },
    /// Copy a recipe at a new batch size
    Scale {
        id: i32,
        volume: f64,
    },
    Duplicate {
        id: i32,
        name: String,
    },
    /// Copy a recipe as the next version of its family
    Vary {
        id: i32,
        description: String,
    },
    Favorite {
        id: i32,
    },
    Delete {
        id: i32,
    },
    Cost {
        id: i32,
    },
    /// Spread a measured total cost over a recipe's ingredients
    Reconcile {
        id: i32,
        total: f64,
    },
    Ingredients {
        #[arg(long)]
        category: Option<IngredientCategory>,
        #[arg(long)]
        available: bool,
    },
    Substitute {
        id: i32,
        beverage: BeverageType,
        /// Do not rank commonly available ingredients first
        #[arg(long)]
        any: bool,
    },
}

/// This is where the database lives on-disk. On Linux it should be like:
/// `~/.local/share/brewbook/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or("failed to get user home directory")?;
    let path = dirs.data_dir().join("brewbook");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn print_recipe_line(recipe: &Recipe) {
    println!(
        "{:>4}  {}{}  [{}, {} {}, v{}]",
        recipe.id,
        recipe.name,
        if recipe.is_favorite { " *" } else { "" },
        recipe.beverage_type,
        recipe.batch_size,
        recipe.batch_unit,
        recipe.version
    );
}

fn print_ingredient_line(ingredient: &Ingredient) {
    println!(
        "{:>4}  {}  [{}, intensity {}{}]",
        ingredient.id,
        ingredient.name,
        ingredient.category,
        ingredient.flavor_intensity,
        if ingredient.is_commonly_available {
            ""
        } else {
            ", scarce"
        }
    );
}

fn show(db: &mut Database, id: RecipeId) -> Result<()> {
    let recipe = db
        .recipes()
        .get(id)?
        .ok_or(brewbook::RepositoryError::recipe_not_found(id))?;
    print_recipe_line(&recipe);
    if !recipe.description.is_empty() {
        println!("\n{}", recipe.description);
    }

    println!("\nIngredients:");
    for (usage, ingredient) in db.recipe_ingredients().list(id)? {
        println!(
            "  {:<10} {:>4} min  {} {} {}{}",
            usage.process_step,
            usage.addition_time_minutes,
            usage.quantity,
            usage.unit,
            ingredient.name,
            if usage.is_optional { " (optional)" } else { "" }
        );
    }

    let totals = db.recipe_ingredients().totals(id)?;
    if let Some(cost) = totals.estimated_cost {
        println!("\nEstimated cost: {cost:.2}");
    }
    if let Some(cost) = totals.actual_cost {
        println!("Actual cost: {cost:.2}");
    }

    let lineage = db.recipes().lineage(id)?;
    if lineage.len() > 1 {
        let names: Vec<_> = lineage.iter().map(|r| r.name.as_str()).collect();
        println!("\nLineage: {}", names.join(" <- "));
    }
    if !recipe.instructions.is_empty() {
        println!("\n{}", recipe.instructions);
    }
    if !recipe.notes.is_empty() {
        println!("\nNotes:\n{}", recipe.notes);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::SimpleLogger::new()
        .with_level(log_level(args.verbose))
        .init()?;

    let path = match args.database {
        Some(path) => path,
        None => data_path()?.join("brewbook.sqlite"),
    };
    let mut db = Database::open(path)?;
    let seeded = brewbook::seed::seed_catalog_if_empty(&mut db)?;

    match args.commands {
        Commands::Seed => match seeded {
            Some(summary) => println!("seeded {} ingredients", summary.inserted),
            None => println!("ingredient catalog already present"),
        },
        Commands::List {
            beverage_type,
            favorites,
            recent,
        } => {
            let query = match (beverage_type, favorites, recent) {
                (Some(t), _, _) => RecipeQuery::ByType(t),
                (None, true, _) => RecipeQuery::Favorites,
                (None, false, Some(n)) => RecipeQuery::Recent(n),
                (None, false, None) => RecipeQuery::All,
            };
            for recipe in db.recipes().query(&query)? {
                print_recipe_line(&recipe);
            }
        }
        Commands::Search { text } => {
            for recipe in db.recipes().search(&text)? {
                print_recipe_line(&recipe);
            }
        }
        Commands::Show { id } => show(&mut db, id.into())?,
        Commands::Scale { id, volume } => {
            let new_id = db.recipes().scale(id.into(), volume)?;
            println!("created recipe {new_id}");
        }
        Commands::Duplicate { id, name } => {
            let new_id = db.recipes().duplicate(id.into(), &name)?;
            println!("created recipe {new_id}");
        }
        Commands::Vary { id, description } => {
            let new_id = db.recipes().create_variation(id.into(), &description)?;
            println!("created recipe {new_id}");
        }
        Commands::Favorite { id } => {
            let favorite = db.recipes().toggle_favorite(id.into())?;
            println!(
                "recipe {id} {}",
                if favorite {
                    "is now a favorite"
                } else {
                    "is no longer a favorite"
                }
            );
        }
        Commands::Delete { id } => {
            db.recipes().soft_delete(id.into())?;
            println!("deleted recipe {id}");
        }
        Commands::Cost { id } => match db.recipes().calculate_cost(id.into())? {
            Some(cost) => println!("{cost:.2}"),
            None => println!("no ingredient costs recorded"),
        },
        Commands::Reconcile { id, total } => {
            db.recipes().reconcile_actual_cost(id.into(), total)?;
            println!("recorded actual cost {total:.2} for recipe {id}");
        }
        Commands::Ingredients {
            category,
            available,
        } => {
            let filter = IngredientFilter {
                category,
                commonly_available: available.then_some(true),
                ..IngredientFilter::default()
            };
            for ingredient in db.ingredients().filter(&filter)? {
                print_ingredient_line(&ingredient);
            }
        }
        Commands::Substitute { id, beverage, any } => {
            let substitutes = db.ingredients().substitutes(id.into(), beverage, !any)?;
            if substitutes.is_empty() {
                println!("no substitute for ingredient {id} in {beverage}");
            }
            for ingredient in substitutes {
                print!("x{:<5} ", ingredient.effective_substitution_ratio());
                print_ingredient_line(&ingredient);
            }
        }
    }
    Ok(())
}
