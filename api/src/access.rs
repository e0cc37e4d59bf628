use app::{auth, user};
use okapi::openapi3::{Object, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket::{
    async_trait,
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use rocket_okapi::{
    gen::OpenApiGenerator,
    request::{OpenApiFromRequest, RequestHeaderInput},
};
use thiserror::Error;

use crate::state::RocketState;

/// Request guard for routes that need a signed-in user.
pub struct UserGuard(auth::Grant);

impl UserGuard {
    pub fn grant(&self) -> &auth::Grant {
        &self.0
    }

    pub fn user_id(&self) -> user::Id {
        self.0.user_id
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("access denied")]
    AccessDenied(#[from] auth::AccessDenied),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("token could not be checked")]
    Unavailable,
}

const TOKEN_HEADER: &str = "X-Auth-Token";

#[async_trait]
impl<'r> FromRequest<'r> for UserGuard {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = match req.headers().get_one(TOKEN_HEADER) {
            Some(token) => token,
            None => return Outcome::Error((Status::Forbidden, auth::AccessDenied.into())),
        };
        let state = match req.rocket().state::<RocketState>() {
            Some(state) => state,
            None => return Outcome::Error((Status::InternalServerError, Error::Unavailable)),
        };
        match auth::get_grant(&*state.repository, token).await {
            Ok(grant) => {
                if state.rate_limit.limit(grant.user_id) {
                    log::info!("rate limiting user {:?}", grant.user_id);
                    Outcome::Error((Status::TooManyRequests, Error::RateLimited))
                } else {
                    Outcome::Success(Self(grant))
                }
            }
            Err(auth::Error::AccessDenied(e)) => Outcome::Error((Status::Forbidden, e.into())),
            Err(e) => {
                log::error!("failed to check token: {}", e);
                Outcome::Error((Status::InternalServerError, Error::Unavailable))
            }
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for UserGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        let security_scheme = SecurityScheme {
            description: Some(format!(
                "Requires the token returned by /signin: \"{}\".",
                TOKEN_HEADER
            )),
            data: SecuritySchemeData::ApiKey {
                name: TOKEN_HEADER.to_owned(),
                location: "header".to_owned(),
            },
            extensions: Object::default(),
        };
        let mut security_req = SecurityRequirement::new();
        security_req.insert(TOKEN_HEADER.to_owned(), Vec::new());
        Ok(RequestHeaderInput::Security(
            TOKEN_HEADER.to_owned(),
            security_scheme,
            security_req,
        ))
    }
}
