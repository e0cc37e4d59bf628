//! Offer accounting. A contribution is checked against the wish it targets, as loaded with its
//! owner and offers:
//! - the owner of a wish cannot contribute to it,
//! - the offers on a wish can never add up to more than its price.
//!
//! Both checks run inside [`super::Store::insert_offer_checked`], which the store executes
//! atomically with the insert, so two concurrent contributions cannot both pass the ceiling
//! check against the same total.

use crate::money::Cents;
use crate::validation::{self, decimal_amount, ValidationError};
use crate::{user, wish};
use chrono::{DateTime, Utc};
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum Error {
    #[error("wish not found")]
    WishNotFound,
    #[error("offer not found")]
    NotFound,
    #[error("cannot contribute to own wish")]
    OwnWish,
    #[error("contribution exceeds remaining amount needed ({remaining} remaining)")]
    ExceedsRemaining { remaining: Cents },
    #[error("{0}")]
    Store(#[from] crate::database::Error),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub i64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    pub id: Id,
    pub user_id: user::Id,
    pub item_id: wish::Id,
    pub amount: Cents,
    pub hidden: bool,
    pub created: DateTime<Utc>,
}

/// An offer that passed the accounting checks and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOffer {
    pub(crate) user_id: user::Id,
    pub(crate) item_id: wish::Id,
    pub(crate) amount: Cents,
    pub(crate) hidden: bool,
    pub(crate) created: DateTime<Utc>,
}

impl NewOffer {
    pub(crate) fn into_offer(self, id: Id) -> Offer {
        Offer {
            id,
            user_id: self.user_id,
            item_id: self.item_id,
            amount: self.amount,
            hidden: self.hidden,
            created: self.created,
        }
    }
}

/// Raw contribution input.
#[derive(Debug, Clone, Validate)]
pub struct OfferRequest {
    pub item_id: wish::Id,
    #[validate(custom = "decimal_amount")]
    pub amount: String,
    pub hidden: Option<bool>,
}

/// Contribution input that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub(crate) item_id: wish::Id,
    pub(crate) amount: Cents,
    pub(crate) hidden: bool,
}

impl OfferRequest {
    pub fn validate(self) -> Result<Contribution, ValidationError> {
        validation::check(&self)?;
        Ok(Contribution {
            item_id: self.item_id,
            amount: validation::amount("amount", &self.amount)?,
            hidden: self.hidden.unwrap_or(false),
        })
    }
}

impl Contribution {
    pub fn item_id(&self) -> wish::Id {
        self.item_id
    }

    pub fn amount(&self) -> Cents {
        self.amount
    }

    /// Checks this contribution by `contributor` against the current state of the wish.
    pub fn accept(
        &self,
        contributor: user::Id,
        funding: &wish::Expanded,
    ) -> Result<NewOffer, Error> {
        if funding.wish.id != self.item_id {
            return Err(Error::WishNotFound);
        }
        if funding.owner.id == contributor {
            return Err(Error::OwnWish);
        }
        let remaining = funding.remaining();
        if self.amount > remaining {
            return Err(Error::ExceedsRemaining {
                remaining: remaining.max(Cents::zero()),
            });
        }
        Ok(NewOffer {
            user_id: contributor,
            item_id: self.item_id,
            amount: self.amount,
            hidden: self.hidden,
            created: Utc::now(),
        })
    }
}

/// How much of the reference graph to load with an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relations {
    /// The contributor and the target wish.
    References,
    /// Also the contributor's wishes, the wish owner and every offer on the wish.
    Full,
}

/// An offer with its references resolved.
#[derive(Debug, Clone)]
pub struct View {
    pub offer: Offer,
    pub contributor: user::User,
    pub item: wish::Wish,
    /// Present only for [`Relations::Full`].
    pub details: Option<Details>,
}

#[derive(Debug, Clone)]
pub struct Details {
    pub contributor_wishes: Vec<wish::Wish>,
    pub item_owner: user::User,
    pub item_offers: Vec<Offer>,
}
