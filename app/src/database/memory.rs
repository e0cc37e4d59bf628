//! A store kept entirely in process memory. Used by the tests and when no database is
//! configured. All tables sit behind one mutex, so every operation, including the offer
//! ceiling check, sees a consistent snapshot.

use super::Error;
use crate::auth::{self, Credentials, PasswordHash, Token, TokenHash};
use crate::money::Cents;
use crate::offer::{self, Check, Offer};
use crate::user::{self, Lookup, NewUser, ProfileUpdate, User};
use crate::wish::{self, Draft, Wish};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct Memory {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<user::Id, StoredUser>,
    wishes: BTreeMap<wish::Id, Wish>,
    offers: BTreeMap<offer::Id, Offer>,
    tokens: HashMap<TokenHash, Token>,
    last_user_id: i64,
    last_wish_id: i64,
    last_offer_id: i64,
}

#[derive(Debug)]
struct StoredUser {
    user: User,
    password: PasswordHash,
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

impl Tables {
    fn user_taken(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<user::Id>,
    ) -> Option<&User> {
        self.users
            .values()
            .map(|stored| &stored.user)
            .filter(|user| Some(user.id) != except)
            .find(|user| {
                username == Some(user.username.as_str()) || email == Some(user.email.as_str())
            })
    }

    fn raised(&self, item: wish::Id) -> Cents {
        self.offers
            .values()
            .filter(|offer| offer.item_id == item)
            .map(|offer| offer.amount)
            .sum()
    }

    /// A copy of the stored wish with its raised total filled in.
    fn wish(&self, wish: &Wish) -> Wish {
        Wish {
            raised: self.raised(wish.id),
            ..wish.clone()
        }
    }

    fn offers_by_item(&self, item: wish::Id) -> Vec<Offer> {
        self.offers
            .values()
            .filter(|offer| offer.item_id == item)
            .cloned()
            .collect()
    }
}

fn newest_first(wishes: impl Iterator<Item = Wish>) -> Vec<Wish> {
    let mut wishes: Vec<Wish> = wishes.collect();
    wishes.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
    wishes
}

#[async_trait]
impl user::Store for Memory {
    async fn insert_user(&self, new_user: NewUser) -> Result<User, user::Error> {
        let mut tables = self.tables.lock().await;
        if tables
            .user_taken(Some(&new_user.username), Some(&new_user.email), None)
            .is_some()
        {
            return Err(user::Error::AlreadyExists);
        }
        let user = User {
            id: user::Id(next_id(&mut tables.last_user_id)),
            username: new_user.username,
            email: new_user.email,
            about: new_user.about,
            avatar: new_user.avatar,
            created: new_user.created,
            updated: new_user.created,
        };
        tables.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password: new_user.password,
            },
        );
        Ok(user)
    }

    async fn find_user(&self, lookup: Lookup<'_>) -> Result<Option<User>, Error> {
        let tables = self.tables.lock().await;
        Ok(match lookup {
            Lookup::Id(id) => tables.users.get(&id).map(|stored| stored.user.clone()),
            Lookup::Username(username) => tables
                .users
                .values()
                .find(|stored| stored.user.username == username)
                .map(|stored| stored.user.clone()),
        })
    }

    async fn find_users(&self) -> Result<Vec<User>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().map(|stored| stored.user.clone()).collect())
    }

    async fn find_users_by_id(&self, ids: &[user::Id]) -> Result<Vec<User>, Error> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id))
            .map(|stored| stored.user.clone())
            .collect())
    }

    async fn find_conflicting_user(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<user::Id>,
    ) -> Result<Option<User>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.user_taken(username, email, except).cloned())
    }

    async fn update_user(
        &self,
        id: user::Id,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, user::Error> {
        let mut tables = self.tables.lock().await;
        if tables
            .user_taken(update.username.as_deref(), update.email.as_deref(), Some(id))
            .is_some()
        {
            return Err(user::Error::AlreadyExists);
        }
        Ok(tables.users.get_mut(&id).map(|stored| {
            update.apply(&mut stored.user, now);
            stored.user.clone()
        }))
    }
}

#[async_trait]
impl wish::Store for Memory {
    async fn insert_wish(
        &self,
        owner: user::Id,
        draft: &Draft,
        created: DateTime<Utc>,
    ) -> Result<Wish, Error> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&owner) {
            return Err(Error::DanglingReference(format!("owner {:?}", owner)));
        }
        let wish = Wish {
            id: wish::Id(next_id(&mut tables.last_wish_id)),
            name: draft.name.clone(),
            link: draft.link.clone(),
            image: draft.image.clone(),
            price: draft.price,
            description: draft.description.clone(),
            owner_id: owner,
            raised: Cents::zero(),
            created,
        };
        tables.wishes.insert(wish.id, wish.clone());
        Ok(wish)
    }

    async fn find_wish(&self, id: wish::Id) -> Result<Option<Wish>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.wishes.get(&id).map(|wish| tables.wish(wish)))
    }

    async fn find_wishes(&self) -> Result<Vec<Wish>, Error> {
        let tables = self.tables.lock().await;
        Ok(newest_first(tables.wishes.values().map(|wish| tables.wish(wish))))
    }

    async fn find_wishes_by_id(&self, ids: &[wish::Id]) -> Result<Vec<Wish>, Error> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.wishes.get(id))
            .map(|wish| tables.wish(wish))
            .collect())
    }

    async fn find_wishes_by_owner(&self, owner: user::Id) -> Result<Vec<Wish>, Error> {
        let tables = self.tables.lock().await;
        Ok(newest_first(
            tables
                .wishes
                .values()
                .filter(|wish| wish.owner_id == owner)
                .map(|wish| tables.wish(wish)),
        ))
    }
}

#[async_trait]
impl offer::Store for Memory {
    async fn insert_offer_checked(
        &self,
        item: wish::Id,
        check: &Check<'_>,
    ) -> Result<Offer, offer::Error> {
        let mut tables = self.tables.lock().await;
        let wish = tables
            .wishes
            .get(&item)
            .map(|wish| tables.wish(wish))
            .ok_or(offer::Error::WishNotFound)?;
        let owner = tables
            .users
            .get(&wish.owner_id)
            .map(|stored| stored.user.clone())
            .ok_or_else(|| {
                Error::DanglingReference(format!("owner {:?} of wish {:?}", wish.owner_id, item))
            })?;
        let offers = tables.offers_by_item(item);

        let new_offer = check(&wish::Expanded {
            wish,
            owner,
            offers,
        })?;
        let offer = new_offer.into_offer(offer::Id(next_id(&mut tables.last_offer_id)));
        tables.offers.insert(offer.id, offer.clone());
        Ok(offer)
    }

    async fn find_offer(&self, id: offer::Id) -> Result<Option<Offer>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.offers.get(&id).cloned())
    }

    async fn find_offers(&self) -> Result<Vec<Offer>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.offers.values().cloned().collect())
    }

    async fn find_offers_by_item(&self, item: wish::Id) -> Result<Vec<Offer>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.offers_by_item(item))
    }
}

#[async_trait]
impl auth::Store for Memory {
    async fn find_credentials(&self, username: &str) -> Result<Option<Credentials>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|stored| stored.user.username == username)
            .map(|stored| Credentials {
                user_id: stored.user.id,
                password: stored.password.clone(),
            }))
    }

    async fn insert_token(&self, token: &Token, hash: &TokenHash) -> Result<(), Error> {
        let mut tables = self.tables.lock().await;
        tables.tokens.insert(hash.clone(), token.clone());
        Ok(())
    }

    async fn find_token(&self, hash: &TokenHash) -> Result<Option<Token>, Error> {
        let tables = self.tables.lock().await;
        Ok(tables.tokens.get(hash).cloned())
    }
}
