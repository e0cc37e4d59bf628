use crate::{auth, offer, user, wish};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use url::Url;

pub use memory::Memory;
pub use migrations::run_migrations;
pub use seeder::{seed_development_data, SeedError};

mod memory;
mod migrations;
mod seeder;


pub type Database = sqlx::Pool<sqlx::Postgres>;
pub(crate) type Transaction = sqlx::Transaction<'static, sqlx::Postgres>;

/// Every store the domain modules need, behind one object. Implemented by [`Database`] and by
/// [`Memory`].
pub trait Repository: user::Store + wish::Store + offer::Store + auth::Store {}

impl<T> Repository for T where T: user::Store + wish::Store + offer::Store + auth::Store {}

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("dangling reference: {0}")]
    DanglingReference(String),
}

pub async fn connect(url: &Url) -> Result<Database, sqlx::Error> {
    PgPoolOptions::new().connect(url.as_str()).await
}

/// Unique constraint violations are reported with SQLSTATE 23505.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(e) => e.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CountRow {
    pub count: i64,
}
