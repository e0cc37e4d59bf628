//! Routes for creating and browsing wishes.

use super::models::{OfferModel, ProfileModel, WishModel, WishesResponse};
use crate::{
    access,
    error::{self, JsonResult},
    state::RocketState,
};
use app::wish;
use rocket::{get, post, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct WishRequest {
    /// 1 to 250 characters.
    name: String,
    /// Where the gift can be bought.
    link: String,
    /// Picture of the gift.
    image: String,
    /// Target price as a decimal string with at most two fraction digits, e.g. "49.90".
    price: String,
    /// 1 to 1024 characters.
    description: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct WishResponse {
    wish: WishModel,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct ExpandedWishResponse {
    wish: WishModel,
    owner: ProfileModel,
    offers: Vec<OfferModel>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum Error {
    /// Unexpected error, please contact support.
    Unknown,
    /// A field failed validation; the description names it.
    ValidationFailed,
    /// No wish with that id.
    WishNotFound,
}

fn wish_error(e: wish::Error) -> error::JsonError<Error> {
    match e {
        wish::Error::NotFound => error::not_found(Error::WishNotFound, e.to_string()),
        wish::Error::Store(_) => error::unexpected(Error::Unknown, &e),
    }
}

/// Create a wish owned by the signed-in user.
#[openapi(tag = "Wishes")]
#[post("/wishes", data = "<req>")]
pub(super) async fn post(
    state: &State<RocketState>,
    guard: access::UserGuard,
    req: Json<WishRequest>,
) -> JsonResult<WishResponse, Error> {
    let req = req.into_inner();
    let draft = wish::WishRequest {
        name: req.name,
        link: req.link,
        image: req.image,
        price: req.price,
        description: req.description,
    }
    .validate()
    .map_err(|e| error::bad_request(Error::ValidationFailed, e.to_string()))?;
    let wish = wish::create(&*state.repository, guard.user_id(), draft)
        .await
        .map_err(wish_error)?;
    Ok(Json(WishResponse {
        wish: WishModel::from_entity(&wish),
    }))
}

/// List all wishes.
#[openapi(tag = "Wishes")]
#[get("/wishes")]
pub(super) async fn list(
    state: &State<RocketState>,
    _guard: access::UserGuard,
) -> JsonResult<WishesResponse, Error> {
    let wishes = wish::find_all(&*state.repository)
        .await
        .map_err(wish_error)?;
    Ok(Json(WishesResponse::from_entities(&wishes)))
}

/// Get a wish with its owner and every offer made on it.
#[openapi(tag = "Wishes")]
#[get("/wishes/<id>")]
pub(super) async fn get(
    state: &State<RocketState>,
    _guard: access::UserGuard,
    id: i64,
) -> JsonResult<ExpandedWishResponse, Error> {
    let expanded = wish::find_one(&*state.repository, wish::Id(id))
        .await
        .map_err(wish_error)?;
    Ok(Json(ExpandedWishResponse {
        wish: WishModel::from_entity(&expanded.wish),
        owner: ProfileModel::from_entity(&expanded.owner),
        offers: expanded.offers.iter().map(OfferModel::from_entity).collect(),
    }))
}
