//! Add top-level routes as submodules here.

use crate::state::RocketState;
use rocket::{Build, Rocket};
use rocket_okapi::{
    openapi_get_routes,
    swagger_ui::{make_swagger_ui, DefaultModelRendering, SwaggerUIConfig},
};

mod auth;
mod models;
mod offers;
mod users;
mod wishes;

const VERSION: &str = "/v0";

pub fn register(rocket: Rocket<Build>, state: RocketState) -> Rocket<Build> {
    let rocket = rocket.manage(state);
    let rocket = rocket.mount(
        VERSION,
        openapi_get_routes![
            auth::signup,
            auth::signin,
            users::list,
            users::me,
            users::update_me,
            users::my_wishes,
            users::get,
            users::wishes,
            wishes::post,
            wishes::list,
            wishes::get,
            offers::post,
            offers::list,
            offers::get,
        ],
    );
    mount_swagger(rocket)
}

pub fn mount_swagger(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount(
        format!("{}/swagger", VERSION),
        make_swagger_ui(&SwaggerUIConfig {
            url: "../openapi.json".to_owned(),
            default_model_rendering: DefaultModelRendering::Model,
            show_extensions: true,
            ..Default::default()
        }),
    )
}
