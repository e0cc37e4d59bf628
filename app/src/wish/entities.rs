use crate::money::Cents;
use crate::validation::{self, decimal_amount, ValidationError};
use crate::{offer, user};
use chrono::{DateTime, Utc};
use validator::Validate;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub i64);

/// A funding target. `raised` is the sum of all offers on the wish at the time it was loaded;
/// it is derived on every read and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wish {
    pub id: Id,
    pub name: String,
    pub link: String,
    pub image: String,
    pub price: Cents,
    pub description: String,
    pub owner_id: user::Id,
    pub raised: Cents,
    pub created: DateTime<Utc>,
}

/// A wish together with its owner and every offer made on it.
#[derive(Debug, Clone)]
pub struct Expanded {
    pub wish: Wish,
    pub owner: user::User,
    pub offers: Vec<offer::Offer>,
}

impl Expanded {
    pub fn raised(&self) -> Cents {
        self.offers.iter().map(|offer| offer.amount).sum()
    }

    /// How much can still be offered before the price is reached.
    pub fn remaining(&self) -> Cents {
        self.wish.price - self.raised()
    }
}

/// Raw wish input.
#[derive(Debug, Clone, Validate)]
pub struct WishRequest {
    #[validate(length(min = 1, max = 250, message = "must be between 1 and 250 characters long"))]
    pub name: String,
    #[validate(url(message = "must be a URL"))]
    pub link: String,
    #[validate(url(message = "must be a URL"))]
    pub image: String,
    #[validate(custom = "decimal_amount")]
    pub price: String,
    #[validate(length(min = 1, max = 1024, message = "must be between 1 and 1024 characters long"))]
    pub description: String,
}

/// Wish input that passed validation.
#[derive(Debug, Clone)]
pub struct Draft {
    pub(crate) name: String,
    pub(crate) link: String,
    pub(crate) image: String,
    pub(crate) price: Cents,
    pub(crate) description: String,
}

impl WishRequest {
    pub fn validate(self) -> Result<Draft, ValidationError> {
        validation::check(&self)?;
        let price = validation::amount("price", &self.price)?;
        Ok(Draft {
            name: self.name,
            link: self.link,
            image: self.image,
            price,
            description: self.description,
        })
    }
}
