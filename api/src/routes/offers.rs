//! Routes for contributing to wishes.

use super::models::{OfferModel, ProfileModel, WishModel};
use crate::{
    access,
    error::{self, JsonResult},
    state::RocketState,
};
use app::{offer, wish};
use rocket::{get, post, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct OfferRequest {
    /// Amount as a decimal string with at most two fraction digits, e.g. "10.50".
    amount: String,
    /// Hide the contributor from other users. Defaults to false.
    hidden: Option<bool>,
    /// The wish to contribute to.
    item_id: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct OfferResponse {
    offer: OfferModel,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct OfferView {
    offer: OfferModel,
    /// The contributor.
    user: ProfileModel,
    /// The wish the offer funds.
    item: WishModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_wishes: Option<Vec<WishModel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    item_owner: Option<ProfileModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    item_offers: Option<Vec<OfferModel>>,
}

impl OfferView {
    fn from_view(view: &offer::View) -> Self {
        let details = view.details.as_ref();
        Self {
            offer: OfferModel::from_entity(&view.offer),
            user: ProfileModel::from_entity(&view.contributor),
            item: WishModel::from_entity(&view.item),
            user_wishes: details.map(|d| {
                d.contributor_wishes
                    .iter()
                    .map(WishModel::from_entity)
                    .collect()
            }),
            item_owner: details.map(|d| ProfileModel::from_entity(&d.item_owner)),
            item_offers: details.map(|d| d.item_offers.iter().map(OfferModel::from_entity).collect()),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct OffersResponse {
    offers: Vec<OfferView>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum Error {
    /// Unexpected error, please contact support.
    Unknown,
    /// A field failed validation; the description names it.
    ValidationFailed,
    /// The wish does not exist.
    WishNotFound,
    /// No offer with that id.
    OfferNotFound,
    /// Users cannot contribute to their own wishes.
    OwnWish,
    /// The amount is more than the wish still needs.
    ExceedsRemaining,
}

fn offer_error(e: offer::Error) -> error::JsonError<Error> {
    match e {
        offer::Error::WishNotFound => error::not_found(Error::WishNotFound, e.to_string()),
        offer::Error::NotFound => error::not_found(Error::OfferNotFound, e.to_string()),
        offer::Error::OwnWish => error::forbidden(Error::OwnWish, e.to_string()),
        offer::Error::ExceedsRemaining { .. } => {
            error::forbidden(Error::ExceedsRemaining, e.to_string())
        }
        offer::Error::Store(_) => error::unexpected(Error::Unknown, &e),
    }
}

/// Contribute to another user's wish.
#[openapi(tag = "Offers")]
#[post("/offers", data = "<req>")]
pub(super) async fn post(
    state: &State<RocketState>,
    guard: access::UserGuard,
    req: Json<OfferRequest>,
) -> JsonResult<OfferResponse, Error> {
    let req = req.into_inner();
    let contribution = offer::OfferRequest {
        item_id: wish::Id(req.item_id),
        amount: req.amount,
        hidden: req.hidden,
    }
    .validate()
    .map_err(|e| error::bad_request(Error::ValidationFailed, e.to_string()))?;
    let offer = offer::create(&*state.repository, guard.grant(), contribution)
        .await
        .map_err(offer_error)?;
    Ok(Json(OfferResponse {
        offer: OfferModel::from_entity(&offer),
    }))
}

/// List all offers with their contributor and wish.
#[openapi(tag = "Offers")]
#[get("/offers")]
pub(super) async fn list(
    state: &State<RocketState>,
    _guard: access::UserGuard,
) -> JsonResult<OffersResponse, Error> {
    let views = offer::find_all(&*state.repository)
        .await
        .map_err(offer_error)?;
    Ok(Json(OffersResponse {
        offers: views.iter().map(OfferView::from_view).collect(),
    }))
}

/// Get an offer with the contributor's wishes, the wish owner and every offer on the wish.
#[openapi(tag = "Offers")]
#[get("/offers/<id>")]
pub(super) async fn get(
    state: &State<RocketState>,
    _guard: access::UserGuard,
    id: i64,
) -> JsonResult<OfferView, Error> {
    let view = offer::find_one(&*state.repository, offer::Id(id))
        .await
        .map_err(offer_error)?;
    Ok(Json(OfferView::from_view(&view)))
}
