//! Routes for querying and updating user profiles.

use super::models::{AccountModel, AccountResponse, ProfileModel, WishesResponse};
use crate::{
    access,
    error::{self, JsonResult},
    state::RocketState,
};
use app::{user, wish};
use rocket::{get, patch, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct UpdateRequest {
    username: Option<String>,
    email: Option<String>,
    about: Option<String>,
    avatar: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct ProfileResponse {
    user: ProfileModel,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct UsersResponse {
    users: Vec<ProfileModel>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum Error {
    /// Unexpected error, please contact support.
    Unknown,
    /// No user with that username or id.
    UserNotFound,
    /// A field failed validation; the description names it.
    ValidationFailed,
    /// The new username or email belongs to another user.
    UserAlreadyExists,
}

fn user_error(e: user::Error) -> error::JsonError<Error> {
    match e {
        user::Error::NotFound => error::not_found(Error::UserNotFound, e.to_string()),
        user::Error::AlreadyExists => error::conflict(Error::UserAlreadyExists, e.to_string()),
        user::Error::Credential(_) | user::Error::Store(_) => error::unexpected(Error::Unknown, &e),
    }
}

fn wish_error(e: wish::Error) -> error::JsonError<Error> {
    error::unexpected(Error::Unknown, &e)
}

/// List all users.
#[openapi(tag = "Users")]
#[get("/users")]
pub(super) async fn list(
    state: &State<RocketState>,
    _guard: access::UserGuard,
) -> JsonResult<UsersResponse, Error> {
    let users = user::find_all(&*state.repository).await.map_err(user_error)?;
    Ok(Json(UsersResponse {
        users: users.iter().map(ProfileModel::from_entity).collect(),
    }))
}

/// Get your own account.
#[openapi(tag = "Users")]
#[get("/users/me")]
pub(super) async fn me(
    state: &State<RocketState>,
    guard: access::UserGuard,
) -> JsonResult<AccountResponse, Error> {
    let user = user::find_by_id(&*state.repository, guard.user_id())
        .await
        .map_err(user_error)?;
    Ok(Json(AccountResponse {
        user: AccountModel::from_entity(&user),
    }))
}

/// Update your own profile. Fields left out stay unchanged.
#[openapi(tag = "Users")]
#[patch("/users/me", data = "<req>")]
pub(super) async fn update_me(
    state: &State<RocketState>,
    guard: access::UserGuard,
    req: Json<UpdateRequest>,
) -> JsonResult<AccountResponse, Error> {
    let req = req.into_inner();
    let update = user::UpdateRequest {
        username: req.username,
        email: req.email,
        about: req.about,
        avatar: req.avatar,
    }
    .validate()
    .map_err(|e| error::bad_request(Error::ValidationFailed, e.to_string()))?;
    let user = user::update(&*state.repository, guard.user_id(), update)
        .await
        .map_err(user_error)?;
    Ok(Json(AccountResponse {
        user: AccountModel::from_entity(&user),
    }))
}

/// List your own wishes.
#[openapi(tag = "Users")]
#[get("/users/me/wishes")]
pub(super) async fn my_wishes(
    state: &State<RocketState>,
    guard: access::UserGuard,
) -> JsonResult<WishesResponse, Error> {
    let wishes = wish::find_by_owner(&*state.repository, guard.user_id())
        .await
        .map_err(wish_error)?;
    Ok(Json(WishesResponse::from_entities(&wishes)))
}

/// Get a user's public profile.
#[openapi(tag = "Users")]
#[get("/users/<username>")]
pub(super) async fn get(
    state: &State<RocketState>,
    _guard: access::UserGuard,
    username: String,
) -> JsonResult<ProfileResponse, Error> {
    let user = user::find_by_username(&*state.repository, &username)
        .await
        .map_err(user_error)?;
    Ok(Json(ProfileResponse {
        user: ProfileModel::from_entity(&user),
    }))
}

/// List a user's wishes.
#[openapi(tag = "Users")]
#[get("/users/<username>/wishes")]
pub(super) async fn wishes(
    state: &State<RocketState>,
    _guard: access::UserGuard,
    username: String,
) -> JsonResult<WishesResponse, Error> {
    let user = user::find_by_username(&*state.repository, &username)
        .await
        .map_err(user_error)?;
    let wishes = wish::find_by_owner(&*state.repository, user.id)
        .await
        .map_err(wish_error)?;
    Ok(Json(WishesResponse::from_entities(&wishes)))
}
