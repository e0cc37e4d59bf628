//! Public routes for creating an account and signing in.

use super::models::{AccountModel, AccountResponse};
use crate::{
    error::{self, JsonResult},
    state::RocketState,
};
use app::{auth, user};
use rocket::{post, serde::json::Json, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct SignupRequest {
    /// Unique username, 1 to 64 characters without whitespace.
    username: String,
    /// Unique email address.
    email: String,
    /// Password, 6 to 128 characters.
    password: String,
    /// Up to 200 characters about yourself.
    about: Option<String>,
    /// Avatar image URL.
    avatar: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct SigninRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct TokenResponse {
    /// Send this token in the X-Auth-Token header. It is only shown once.
    access_token: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum SignupError {
    /// Unexpected error, please contact support.
    Unknown,
    /// A field failed validation; the description names it.
    ValidationFailed,
    /// The username or email is already registered.
    UserAlreadyExists,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum SigninError {
    /// Unexpected error, please contact support.
    Unknown,
    /// Unknown username or wrong password.
    InvalidCredentials,
}

/// Register a new account.
#[openapi(tag = "Auth")]
#[post("/signup", data = "<req>")]
pub(super) async fn signup(
    state: &State<RocketState>,
    req: Json<SignupRequest>,
) -> JsonResult<AccountResponse, SignupError> {
    let req = req.into_inner();
    let signup = user::SignupRequest {
        username: req.username,
        email: req.email,
        password: req.password,
        about: req.about,
        avatar: req.avatar,
    }
    .validate()
    .map_err(|e| error::bad_request(SignupError::ValidationFailed, e.to_string()))?;
    user::signup(&*state.repository, signup)
        .await
        .map(|user| {
            Json(AccountResponse {
                user: AccountModel::from_entity(&user),
            })
        })
        .map_err(|e| match e {
            user::Error::AlreadyExists => {
                error::conflict(SignupError::UserAlreadyExists, e.to_string())
            }
            user::Error::NotFound | user::Error::Credential(_) | user::Error::Store(_) => {
                error::unexpected(SignupError::Unknown, &e)
            }
        })
}

/// Exchange a username and password for an API token.
#[openapi(tag = "Auth")]
#[post("/signin", data = "<req>")]
pub(super) async fn signin(
    state: &State<RocketState>,
    req: Json<SigninRequest>,
) -> JsonResult<TokenResponse, SigninError> {
    auth::signin(&*state.repository, &req.username, &req.password)
        .await
        .map(|issued| {
            Json(TokenResponse {
                access_token: issued.plain,
            })
        })
        .map_err(|e| match e {
            auth::Error::AccessDenied(_) => error::unauthorized(
                SigninError::InvalidCredentials,
                "invalid username or password".to_owned(),
            ),
            auth::Error::Credential(_) | auth::Error::Store(_) => {
                error::unexpected(SigninError::Unknown, &e)
            }
        })
}
