//! Response models shared between the route modules. Money is rendered as a decimal string
//! with two fraction digits.

use app::{offer, user, wish};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;

/// Public profile of a user.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProfileModel {
    /// Unique user identifier.
    id: i64,
    /// Unique username.
    username: String,
    /// Free-form text about the user.
    about: String,
    /// Avatar image URL.
    avatar: String,
    /// Registration time.
    created_at: DateTime<Utc>,
    /// Last profile update.
    updated_at: DateTime<Utc>,
}

impl ProfileModel {
    pub(super) fn from_entity(user: &user::User) -> Self {
        Self {
            id: user.id.0,
            username: user.username.clone(),
            about: user.about.clone(),
            avatar: user.avatar.clone(),
            created_at: user.created,
            updated_at: user.updated,
        }
    }
}

/// The signed-in user's own account, including private fields.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct AccountModel {
    #[serde(flatten)]
    profile: ProfileModel,
    /// Registered email.
    email: String,
}

impl AccountModel {
    pub(super) fn from_entity(user: &user::User) -> Self {
        Self {
            profile: ProfileModel::from_entity(user),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct AccountResponse {
    pub(super) user: AccountModel,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct WishModel {
    /// Unique wish identifier.
    id: i64,
    name: String,
    /// Where the gift can be bought.
    link: String,
    /// Picture of the gift.
    image: String,
    /// Target price.
    price: String,
    /// Sum of all offers made so far.
    raised: String,
    description: String,
    /// The user who wants the gift.
    owner_id: i64,
    created_at: DateTime<Utc>,
}

impl WishModel {
    pub(super) fn from_entity(wish: &wish::Wish) -> Self {
        Self {
            id: wish.id.0,
            name: wish.name.clone(),
            link: wish.link.clone(),
            image: wish.image.clone(),
            price: wish.price.to_string(),
            raised: wish.raised.to_string(),
            description: wish.description.clone(),
            owner_id: wish.owner_id.0,
            created_at: wish.created,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct WishesResponse {
    pub(super) wishes: Vec<WishModel>,
}

impl WishesResponse {
    pub(super) fn from_entities(wishes: &[wish::Wish]) -> Self {
        Self {
            wishes: wishes.iter().map(WishModel::from_entity).collect(),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct OfferModel {
    /// Unique offer identifier.
    id: i64,
    /// The contributing user.
    user_id: i64,
    /// The wish the offer funds.
    item_id: i64,
    /// Contributed amount.
    amount: String,
    /// Whether the contributor asked to stay anonymous.
    hidden: bool,
    created_at: DateTime<Utc>,
}

impl OfferModel {
    pub(super) fn from_entity(offer: &offer::Offer) -> Self {
        Self {
            id: offer.id.0,
            user_id: offer.user_id.0,
            item_id: offer.item_id.0,
            amount: offer.amount.to_string(),
            hidden: offer.hidden,
            created_at: offer.created,
        }
    }
}
