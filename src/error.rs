// Copyright 2023 Remi Bernotavicius

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("could not open database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("could not migrate database: {0}")]
    Migration(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl RepositoryError {
    pub fn recipe_not_found(id: crate::RecipeId) -> Self {
        Self::NotFound {
            entity: "recipe",
            id: id.get(),
        }
    }

    pub fn ingredient_not_found(id: crate::IngredientId) -> Self {
        Self::NotFound {
            entity: "ingredient",
            id: id.get(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Connection(_) | Self::Migration(_)
        )
    }
}

#[test]
fn error_messages() {
    let e = RepositoryError::recipe_not_found(4.into());
    assert_eq!(e.to_string(), "recipe 4 not found");
    assert!(e.is_not_found());
    assert!(!e.is_storage());

    let e = RepositoryError::invalid("batch size must be positive");
    assert_eq!(
        e.to_string(),
        "invalid argument: batch size must be positive"
    );

    let e = RepositoryError::from(diesel::result::Error::RollbackTransaction);
    assert!(e.is_storage());
}
