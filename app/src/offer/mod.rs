use crate::{auth, database, user, wish};
use async_trait::async_trait;
use std::collections::HashMap;

mod entities;

pub use entities::{
    Contribution, Details, Error, Id, NewOffer, Offer, OfferRequest, Relations, View,
};

/// Decides whether an offer may be recorded against the wish, as loaded inside the store's
/// atomic section.
pub type Check<'a> = dyn Fn(&wish::Expanded) -> Result<NewOffer, Error> + Send + Sync + 'a;

#[async_trait]
pub trait Store: Send + Sync {
    /// Loads the wish with its owner and offers, runs `check` and stores the offer it returns,
    /// all without letting another offer on the same wish interleave. Fails with
    /// [`Error::WishNotFound`] if the wish does not exist.
    async fn insert_offer_checked(&self, item: wish::Id, check: &Check<'_>)
        -> Result<Offer, Error>;
    async fn find_offer(&self, id: Id) -> Result<Option<Offer>, database::Error>;
    async fn find_offers(&self) -> Result<Vec<Offer>, database::Error>;
    async fn find_offers_by_item(&self, item: wish::Id) -> Result<Vec<Offer>, database::Error>;
}

/// Records a contribution by the grant holder.
pub async fn create<S: Store + ?Sized>(
    store: &S,
    grant: &auth::Grant,
    contribution: Contribution,
) -> Result<Offer, Error> {
    let contributor = grant.user_id;
    let result = store
        .insert_offer_checked(contribution.item_id(), &|funding: &wish::Expanded| {
            contribution.accept(contributor, funding)
        })
        .await;
    match result {
        Ok(ref offer) => log::info!(
            "user {:?} offered {} on wish {:?} as {:?}",
            contributor,
            offer.amount,
            offer.item_id,
            offer.id
        ),
        Err(ref e) => log::info!(
            "rejected offer of {} by user {:?} on wish {:?}: {}",
            contribution.amount(),
            contributor,
            contribution.item_id(),
            e
        ),
    }
    result
}

pub async fn find_all<S>(store: &S) -> Result<Vec<View>, Error>
where
    S: Store + user::Store + wish::Store + ?Sized,
{
    let offers = store.find_offers().await?;
    expand(store, offers, Relations::References).await
}

pub async fn find_one<S>(store: &S, id: Id) -> Result<View, Error>
where
    S: Store + user::Store + wish::Store + ?Sized,
{
    let offer = store.find_offer(id).await?.ok_or(Error::NotFound)?;
    expand(store, vec![offer], Relations::Full)
        .await?
        .pop()
        .ok_or(Error::NotFound)
}

/// Resolves the references of `offers` as deep as `relations` asks for.
pub async fn expand<S>(store: &S, offers: Vec<Offer>, relations: Relations) -> Result<Vec<View>, Error>
where
    S: Store + user::Store + wish::Store + ?Sized,
{
    let mut wish_ids: Vec<wish::Id> = offers.iter().map(|offer| offer.item_id).collect();
    wish_ids.sort();
    wish_ids.dedup();
    let wishes: HashMap<wish::Id, wish::Wish> = store
        .find_wishes_by_id(&wish_ids)
        .await?
        .into_iter()
        .map(|wish| (wish.id, wish))
        .collect();

    let mut user_ids: Vec<user::Id> = offers.iter().map(|offer| offer.user_id).collect();
    if relations == Relations::Full {
        user_ids.extend(wishes.values().map(|wish| wish.owner_id));
    }
    user_ids.sort();
    user_ids.dedup();
    let users: HashMap<user::Id, user::User> = store
        .find_users_by_id(&user_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let mut views = Vec::with_capacity(offers.len());
    for offer in offers {
        let contributor = lookup(&users, offer.user_id, "contributor", offer.id)?;
        let item = lookup(&wishes, offer.item_id, "wish", offer.id)?;
        let details = match relations {
            Relations::References => None,
            Relations::Full => Some(Details {
                contributor_wishes: store.find_wishes_by_owner(contributor.id).await?,
                item_owner: lookup(&users, item.owner_id, "wish owner", offer.id)?,
                item_offers: store.find_offers_by_item(item.id).await?,
            }),
        };
        views.push(View {
            offer,
            contributor,
            item,
            details,
        });
    }
    Ok(views)
}

fn lookup<K, V>(map: &HashMap<K, V>, key: K, what: &str, offer: Id) -> Result<V, Error>
where
    K: std::hash::Hash + Eq + std::fmt::Debug,
    V: Clone,
{
    map.get(&key).cloned().ok_or_else(|| {
        database::Error::DanglingReference(format!("{} {:?} of offer {:?}", what, key, offer))
            .into()
    })
}

pub(crate) mod queries {
    use super::{Check, Error, Id, NewOffer, Offer, Store};
    use crate::database::{self, Database};
    use crate::{money::Cents, user, wish};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use const_format::formatcp;

    const COLUMNS: &str = "id, user_id, item_id, amount_cents, hidden, created";

    #[async_trait]
    impl Store for Database {
        async fn insert_offer_checked(
            &self,
            item: wish::Id,
            check: &Check<'_>,
        ) -> Result<Offer, Error> {
            let mut data_tx = self.begin().await.map_err(database::Error::from)?;
            // Concurrent offers on the same wish queue up here until this transaction ends.
            if !wish::queries::lock(&mut data_tx, item)
                .await
                .map_err(database::Error::from)?
            {
                return Err(Error::WishNotFound);
            }
            let wish = wish::queries::by_id(&mut data_tx, item)
                .await
                .map_err(database::Error::from)?
                .ok_or(Error::WishNotFound)?;
            let owner = user::queries::by_id(&mut data_tx, wish.owner_id)
                .await
                .map_err(database::Error::from)?
                .ok_or_else(|| {
                    database::Error::DanglingReference(format!(
                        "owner {:?} of wish {:?}",
                        wish.owner_id, wish.id
                    ))
                })?;
            let offers = by_item(&mut data_tx, item)
                .await
                .map_err(database::Error::from)?;

            let new_offer = check(&wish::Expanded {
                wish,
                owner,
                offers,
            })?;
            let offer = insert(&mut data_tx, new_offer)
                .await
                .map_err(database::Error::from)?;
            data_tx.commit().await.map_err(database::Error::from)?;
            Ok(offer)
        }

        async fn find_offer(&self, id: Id) -> Result<Option<Offer>, database::Error> {
            Ok(sqlx::query_as::<_, OfferRow>(formatcp!(
                "SELECT {} FROM offers WHERE id = $1",
                COLUMNS
            ))
            .bind(id.0)
            .fetch_optional(self)
            .await?
            .map(OfferRow::into_entity))
        }

        async fn find_offers(&self) -> Result<Vec<Offer>, database::Error> {
            Ok(
                sqlx::query_as::<_, OfferRow>(formatcp!("SELECT {} FROM offers ORDER BY id", COLUMNS))
                    .fetch_all(self)
                    .await?
                    .into_iter()
                    .map(OfferRow::into_entity)
                    .collect(),
            )
        }

        async fn find_offers_by_item(
            &self,
            item: wish::Id,
        ) -> Result<Vec<Offer>, database::Error> {
            Ok(by_item(self, item).await?)
        }
    }

    async fn by_item<'e, E>(executor: E, item: wish::Id) -> Result<Vec<Offer>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        Ok(sqlx::query_as::<_, OfferRow>(formatcp!(
            "SELECT {} FROM offers WHERE item_id = $1 ORDER BY id",
            COLUMNS
        ))
        .bind(item.0)
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(OfferRow::into_entity)
        .collect())
    }

    async fn insert(
        data_tx: &mut database::Transaction,
        new_offer: NewOffer,
    ) -> Result<Offer, sqlx::Error> {
        let row = sqlx::query_as::<_, IdRow>(
            r#"INSERT INTO offers (user_id, item_id, amount_cents, hidden, created)
                VALUES ($1, $2, $3, $4, $5) RETURNING id"#,
        )
        .bind(new_offer.user_id.0)
        .bind(new_offer.item_id.0)
        .bind(new_offer.amount.0)
        .bind(new_offer.hidden)
        .bind(new_offer.created)
        .fetch_one(&mut *data_tx)
        .await?;
        Ok(new_offer.into_offer(Id(row.id)))
    }

    #[derive(sqlx::FromRow, Debug)]
    struct IdRow {
        id: i64,
    }

    #[derive(sqlx::FromRow, Debug)]
    struct OfferRow {
        id: i64,
        user_id: i64,
        item_id: i64,
        amount_cents: i64,
        hidden: bool,
        created: DateTime<Utc>,
    }

    impl OfferRow {
        fn into_entity(self) -> Offer {
            Offer {
                id: Id(self.id),
                user_id: user::Id(self.user_id),
                item_id: wish::Id(self.item_id),
                amount: Cents(self.amount_cents),
                hidden: self.hidden,
                created: self.created,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Memory;
    use crate::money::Cents;
    use std::sync::Arc;
    use tokio::sync::Barrier;

    struct Fixture {
        store: Memory,
        owner: user::User,
        wish: wish::Wish,
    }

    async fn signup(store: &Memory, username: &str) -> user::User {
        let signup = user::SignupRequest {
            username: username.to_owned(),
            email: format!("{}@example.com", username),
            password: "password".to_owned(),
            about: None,
            avatar: None,
        }
        .validate()
        .unwrap();
        user::signup(store, signup).await.unwrap()
    }

    fn grant(user: &user::User) -> auth::Grant {
        auth::Grant {
            token_id: auth::TokenId::default(),
            user_id: user.id,
        }
    }

    fn contribution(item: wish::Id, amount: &str) -> Contribution {
        OfferRequest {
            item_id: item,
            amount: amount.to_owned(),
            hidden: None,
        }
        .validate()
        .unwrap()
    }

    /// A wish priced at 100.00 owned by "owner".
    async fn fixture() -> Fixture {
        let store = Memory::default();
        let owner = signup(&store, "owner").await;
        let draft = wish::WishRequest {
            name: "Bike".to_owned(),
            link: "https://example.com/bike".to_owned(),
            image: "https://example.com/bike.png".to_owned(),
            price: "100.00".to_owned(),
            description: "Red and fast".to_owned(),
        }
        .validate()
        .unwrap();
        let wish = wish::create(&store, owner.id, draft).await.unwrap();
        Fixture { store, owner, wish }
    }

    #[tokio::test]
    async fn full_price_then_one_cent_more() {
        let Fixture { store, wish, .. } = fixture().await;
        let friend = signup(&store, "friend").await;
        let latecomer = signup(&store, "latecomer").await;

        let offer = create(&store, &grant(&friend), contribution(wish.id, "100.00"))
            .await
            .unwrap();
        assert_eq!(offer.amount, Cents(10_000));
        assert_eq!(offer.user_id, friend.id);

        let late = create(&store, &grant(&latecomer), contribution(wish.id, "0.01")).await;
        assert!(matches!(
            late,
            Err(Error::ExceedsRemaining { remaining }) if remaining == Cents::zero()
        ));
        assert_eq!(find_all(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn owner_cannot_fund_own_wish() {
        let Fixture {
            store, owner, wish, ..
        } = fixture().await;
        let result = create(&store, &grant(&owner), contribution(wish.id, "10.00")).await;
        assert!(matches!(result, Err(Error::OwnWish)));
        assert!(find_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_wish_creates_nothing() {
        let Fixture { store, .. } = fixture().await;
        let friend = signup(&store, "friend").await;
        let result = create(&store, &grant(&friend), contribution(wish::Id(999), "1.00")).await;
        assert!(matches!(result, Err(Error::WishNotFound)));
        assert!(find_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exact_remaining_amount_is_accepted() {
        let Fixture { store, wish, .. } = fixture().await;
        let friend = signup(&store, "friend").await;
        create(&store, &grant(&friend), contribution(wish.id, "62.50"))
            .await
            .unwrap();
        create(&store, &grant(&friend), contribution(wish.id, "37.50"))
            .await
            .unwrap();

        let funded = wish::find_one(&store, wish.id).await.unwrap();
        assert_eq!(funded.raised(), Cents(10_000));
        assert_eq!(funded.wish.raised, Cents(10_000));
        assert_eq!(funded.remaining(), Cents::zero());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_contributions_never_overfund() {
        let Fixture { store, wish, .. } = fixture().await;
        let store = Arc::new(store);
        let mut friends = Vec::new();
        for i in 0..8 {
            friends.push(signup(&store, &format!("friend{}", i)).await);
        }

        let start = Arc::new(Barrier::new(friends.len()));
        let mut handles = Vec::new();
        for friend in friends {
            let store = Arc::clone(&store);
            let start = Arc::clone(&start);
            let item = wish.id;
            handles.push(tokio::spawn(async move {
                start.wait().await;
                create(&*store, &grant(&friend), contribution(item, "30.00")).await
            }));
        }
        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(Error::ExceedsRemaining { .. }) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(accepted, 3);
        let funded = wish::find_one(&*store, wish.id).await.unwrap();
        assert_eq!(funded.raised(), Cents(9_000));
        assert_eq!(funded.offers.len(), 3);
    }

    #[tokio::test]
    async fn find_all_resolves_references_only() {
        let Fixture {
            store, owner, wish, ..
        } = fixture().await;
        let friend = signup(&store, "friend").await;
        create(&store, &grant(&friend), contribution(wish.id, "10"))
            .await
            .unwrap();

        let views = find_all(&store).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].contributor, friend);
        assert_eq!(views[0].item.id, wish.id);
        assert_eq!(views[0].item.owner_id, owner.id);
        assert!(views[0].details.is_none());
    }

    #[tokio::test]
    async fn find_one_expands_the_graph() {
        let Fixture {
            store, owner, wish, ..
        } = fixture().await;
        let friend = signup(&store, "friend").await;
        let other = signup(&store, "other").await;
        let friends_wish = wish::create(
            &store,
            friend.id,
            wish::WishRequest {
                name: "Kite".to_owned(),
                link: "https://example.com/kite".to_owned(),
                image: "https://example.com/kite.png".to_owned(),
                price: "20".to_owned(),
                description: "Blue".to_owned(),
            }
            .validate()
            .unwrap(),
        )
        .await
        .unwrap();
        let mine = create(&store, &grant(&friend), contribution(wish.id, "10"))
            .await
            .unwrap();
        create(&store, &grant(&other), contribution(wish.id, "5"))
            .await
            .unwrap();

        let view = find_one(&store, mine.id).await.unwrap();
        assert_eq!(view.offer, mine);
        assert_eq!(view.contributor, friend);
        assert_eq!(view.item.raised, Cents(1_500));
        let details = view.details.unwrap();
        assert_eq!(details.item_owner, owner);
        assert_eq!(details.contributor_wishes, vec![friends_wish]);
        assert_eq!(details.item_offers.len(), 2);
    }

    #[tokio::test]
    async fn reads_do_not_mutate() {
        let Fixture { store, wish, .. } = fixture().await;
        let friend = signup(&store, "friend").await;
        let offer = create(&store, &grant(&friend), contribution(wish.id, "10"))
            .await
            .unwrap();

        for _ in 0..3 {
            find_all(&store).await.unwrap();
            find_one(&store, offer.id).await.unwrap();
        }
        assert_eq!(find_all(&store).await.unwrap().len(), 1);
        assert_eq!(
            wish::find_one(&store, wish.id).await.unwrap().raised(),
            Cents(1_000)
        );
    }

    #[tokio::test]
    async fn missing_offer_is_not_found() {
        let Fixture { store, .. } = fixture().await;
        assert!(matches!(find_one(&store, Id(5)).await, Err(Error::NotFound)));
    }
}
