//! Wishes: funding targets owned by a user. Offers on a wish are recorded by [`crate::offer`];
//! this module only reads them to report how much has been raised.

use crate::{database, offer, user};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod entities;

pub use entities::{Draft, Expanded, Id, Wish, WishRequest};

#[derive(Debug, Error)]
pub enum Error {
    #[error("wish not found")]
    NotFound,
    #[error("{0}")]
    Store(#[from] database::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_wish(
        &self,
        owner: user::Id,
        draft: &Draft,
        created: DateTime<Utc>,
    ) -> Result<Wish, database::Error>;
    async fn find_wish(&self, id: Id) -> Result<Option<Wish>, database::Error>;
    async fn find_wishes(&self) -> Result<Vec<Wish>, database::Error>;
    async fn find_wishes_by_id(&self, ids: &[Id]) -> Result<Vec<Wish>, database::Error>;
    async fn find_wishes_by_owner(&self, owner: user::Id) -> Result<Vec<Wish>, database::Error>;
}

pub async fn create<S: Store + ?Sized>(
    store: &S,
    owner: user::Id,
    draft: Draft,
) -> Result<Wish, Error> {
    let wish = store.insert_wish(owner, &draft, Utc::now()).await?;
    log::info!(
        "user {:?} created wish {:?} priced at {}",
        owner,
        wish.id,
        wish.price
    );
    Ok(wish)
}

pub async fn find_all<S: Store + ?Sized>(store: &S) -> Result<Vec<Wish>, Error> {
    Ok(store.find_wishes().await?)
}

pub async fn find_by_owner<S: Store + ?Sized>(
    store: &S,
    owner: user::Id,
) -> Result<Vec<Wish>, Error> {
    Ok(store.find_wishes_by_owner(owner).await?)
}

/// Loads a wish with its owner and offers.
pub async fn find_one<S>(store: &S, id: Id) -> Result<Expanded, Error>
where
    S: Store + user::Store + offer::Store + ?Sized,
{
    let wish = store.find_wish(id).await?.ok_or(Error::NotFound)?;
    let owner = store
        .find_user(user::Lookup::Id(wish.owner_id))
        .await?
        .ok_or_else(|| {
            database::Error::DanglingReference(format!(
                "owner {:?} of wish {:?}",
                wish.owner_id, wish.id
            ))
        })?;
    let offers = store.find_offers_by_item(id).await?;
    Ok(Expanded {
        wish,
        owner,
        offers,
    })
}

pub(crate) mod queries {
    use super::{Draft, Id, Store, Wish};
    use crate::database::{self, Database};
    use crate::{money::Cents, user};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use const_format::formatcp;

    const COLUMNS: &str = "id, name, link, image, price_cents, description, owner_id, created, \
        COALESCE((SELECT SUM(offers.amount_cents) FROM offers WHERE offers.item_id = wishes.id), 0)::BIGINT AS raised_cents";

    #[async_trait]
    impl Store for Database {
        async fn insert_wish(
            &self,
            owner: user::Id,
            draft: &Draft,
            created: DateTime<Utc>,
        ) -> Result<Wish, database::Error> {
            let row = sqlx::query_as::<_, IdRow>(
                r#"INSERT INTO wishes (name, link, image, price_cents, description, owner_id, created)
                    VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id"#,
            )
            .bind(&draft.name)
            .bind(&draft.link)
            .bind(&draft.image)
            .bind(draft.price.0)
            .bind(&draft.description)
            .bind(owner.0)
            .bind(created)
            .fetch_one(self)
            .await?;
            Ok(Wish {
                id: Id(row.id),
                name: draft.name.clone(),
                link: draft.link.clone(),
                image: draft.image.clone(),
                price: draft.price,
                description: draft.description.clone(),
                owner_id: owner,
                raised: Cents::zero(),
                created,
            })
        }

        async fn find_wish(&self, id: Id) -> Result<Option<Wish>, database::Error> {
            Ok(by_id(self, id).await?)
        }

        async fn find_wishes(&self) -> Result<Vec<Wish>, database::Error> {
            Ok(sqlx::query_as::<_, WishRow>(formatcp!(
                "SELECT {} FROM wishes ORDER BY created DESC, id DESC",
                COLUMNS
            ))
            .fetch_all(self)
            .await?
            .into_iter()
            .map(WishRow::into_entity)
            .collect())
        }

        async fn find_wishes_by_id(&self, ids: &[Id]) -> Result<Vec<Wish>, database::Error> {
            let ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
            Ok(sqlx::query_as::<_, WishRow>(formatcp!(
                "SELECT {} FROM wishes WHERE id = ANY($1) ORDER BY id",
                COLUMNS
            ))
            .bind(ids)
            .fetch_all(self)
            .await?
            .into_iter()
            .map(WishRow::into_entity)
            .collect())
        }

        async fn find_wishes_by_owner(
            &self,
            owner: user::Id,
        ) -> Result<Vec<Wish>, database::Error> {
            Ok(sqlx::query_as::<_, WishRow>(formatcp!(
                "SELECT {} FROM wishes WHERE owner_id = $1 ORDER BY created DESC, id DESC",
                COLUMNS
            ))
            .bind(owner.0)
            .fetch_all(self)
            .await?
            .into_iter()
            .map(WishRow::into_entity)
            .collect())
        }
    }

    /// Takes a row lock on the wish until the surrounding transaction ends. Returns false if the
    /// wish does not exist.
    pub(crate) async fn lock<'e, E>(executor: E, id: Id) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(sqlx::query("SELECT id FROM wishes WHERE id = $1 FOR UPDATE")
            .bind(id.0)
            .fetch_optional(executor)
            .await?
            .is_some())
    }

    pub(crate) async fn by_id<'e, E>(executor: E, id: Id) -> Result<Option<Wish>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query_as::<_, WishRow>(formatcp!("SELECT {} FROM wishes WHERE id = $1", COLUMNS))
            .bind(id.0)
            .fetch_optional(executor)
            .await
            .map(|row| row.map(WishRow::into_entity))
    }

    #[derive(sqlx::FromRow, Debug)]
    struct IdRow {
        id: i64,
    }

    #[derive(sqlx::FromRow, Debug)]
    struct WishRow {
        id: i64,
        name: String,
        link: String,
        image: String,
        price_cents: i64,
        description: String,
        owner_id: i64,
        created: DateTime<Utc>,
        raised_cents: i64,
    }

    impl WishRow {
        fn into_entity(self) -> Wish {
            Wish {
                id: Id(self.id),
                name: self.name,
                link: self.link,
                image: self.image,
                price: Cents(self.price_cents),
                description: self.description,
                owner_id: user::Id(self.owner_id),
                raised: Cents(self.raised_cents),
                created: self.created,
            }
        }
    }
}
