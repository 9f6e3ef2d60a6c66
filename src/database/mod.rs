// Copyright 2023 Remi Bernotavicius

use crate::error::{RepositoryError, Result};
use crate::repository::{IngredientRepository, RecipeIngredientRepository, RecipeRepository};
use diesel::dsl::sql;
use diesel::prelude::Connection as _;
use diesel::sql_types::Integer;
use diesel::RunQueryDsl as _;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;
use watch::{ChangeFeed, LiveQuery, Subscription, Table, Watchable};

pub mod models;
pub mod schema;
pub mod watch;

pub type Connection = diesel::sqlite::SqliteConnection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub fn establish_connection(path: impl AsRef<Path>) -> Result<Connection> {
    let mut connection = Connection::establish(&path.as_ref().to_string_lossy())?;
    prepare(&mut connection)?;
    Ok(connection)
}

fn prepare(connection: &mut Connection) -> Result<()> {
    // SQLite leaves foreign keys off per connection, and the cascades depend on them.
    diesel::sql_query("PRAGMA foreign_keys = ON").execute(connection)?;
    connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| RepositoryError::Migration(e.to_string()))?;
    Ok(())
}

pub(crate) fn last_insert_rowid(conn: &mut Connection) -> Result<i32> {
    Ok(diesel::select(sql::<Integer>("last_insert_rowid()")).get_result(conn)?)
}

/// The local recipe database. Owns the connection and tells observers about committed
/// writes.
pub struct Database {
    conn: Connection,
    feed: ChangeFeed,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("opening database at {}", path.display());
        Ok(Self::from_connection(establish_connection(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(establish_connection(":memory:")?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            feed: ChangeFeed::default(),
        }
    }

    pub fn recipes(&mut self) -> RecipeRepository<'_> {
        RecipeRepository::new(self)
    }

    pub fn ingredients(&mut self) -> IngredientRepository<'_> {
        IngredientRepository::new(self)
    }

    pub fn recipe_ingredients(&mut self) -> RecipeIngredientRepository<'_> {
        RecipeIngredientRepository::new(self)
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.feed.subscribe()
    }

    pub fn watch<Q: Watchable>(&mut self, query: Q) -> LiveQuery<Q> {
        LiveQuery::new(self, query)
    }

    pub(crate) fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Runs `op` as one transaction, then notifies subscribers that `touched` changed.
    pub(crate) fn write<T>(
        &mut self,
        touched: &[Table],
        op: impl FnOnce(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        let value = self.conn.transaction(op)?;
        self.feed.publish(touched);
        Ok(value)
    }
}

#[test]
fn migrations() {
    let mut connection = Connection::establish(":memory:").unwrap();
    connection.run_pending_migrations(MIGRATIONS).unwrap();
    connection.revert_all_migrations(MIGRATIONS).unwrap();
    connection.run_pending_migrations(MIGRATIONS).unwrap();
}

#[test]
fn foreign_keys_enabled() {
    #[derive(diesel::QueryableByName)]
    struct Pragma {
        #[diesel(sql_type = Integer)]
        foreign_keys: i32,
    }

    let mut db = Database::open_in_memory().unwrap();
    let pragma: Pragma = diesel::sql_query("PRAGMA foreign_keys")
        .get_result(db.connection())
        .unwrap();
    assert_eq!(pragma.foreign_keys, 1);
}

#[test]
fn failed_write_rolls_back_and_stays_quiet() {
    use crate::NewRecipe;
    use diesel::ExpressionMethods as _;

    let mut db = Database::open_in_memory().unwrap();
    let subscription = db.subscribe();
    let result: Result<()> = db.write(&[Table::Recipes], |conn| {
        diesel::insert_into(schema::recipes::table)
            .values((
                &NewRecipe::new("Doomed", models::BeverageType::Beer, 5.0),
                schema::recipes::created_at.eq(chrono::Utc::now().naive_utc()),
                schema::recipes::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        Err(RepositoryError::invalid("abort"))
    });
    assert!(result.is_err());
    assert!(subscription.changed_tables().is_empty());
    assert_eq!(db.recipes().count().unwrap(), 0);
}
