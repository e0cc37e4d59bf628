use std::sync::Arc;
use std::time::Duration;

use api::RateLimit;
use app::database::Memory;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use rocket::serde::json::{json, Value};
use rstest::rstest;

async fn client() -> Client {
    let rocket = api::register(
        rocket::build(),
        Arc::new(Memory::default()),
        RateLimit::new(1000, Duration::from_secs(60)),
    );
    Client::tracked(rocket).await.expect("valid rocket instance")
}

async fn post(client: &Client, path: &str, token: Option<&str>, body: Value) -> (Status, Value) {
    let mut req = client
        .post(format!("/v0{}", path))
        .header(ContentType::JSON)
        .body(body.to_string());
    if let Some(token) = token {
        req = req.header(Header::new("X-Auth-Token", token.to_owned()));
    }
    let res = req.dispatch().await;
    let status = res.status();
    (status, res.into_json().await.unwrap_or(Value::Null))
}

async fn get(client: &Client, path: &str, token: &str) -> (Status, Value) {
    let res = client
        .get(format!("/v0{}", path))
        .header(Header::new("X-Auth-Token", token.to_owned()))
        .dispatch()
        .await;
    let status = res.status();
    (status, res.into_json().await.unwrap_or(Value::Null))
}

/// Signs up and signs in a user, returning its API token.
async fn register(client: &Client, username: &str) -> String {
    let (status, _) = post(
        client,
        "/signup",
        None,
        json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "correct horse",
        }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    let (status, body) = post(
        client,
        "/signin",
        None,
        json!({ "username": username, "password": "correct horse" }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    body["access_token"]
        .as_str()
        .expect("token in signin response")
        .to_owned()
}

async fn create_wish(client: &Client, token: &str, price: &str) -> i64 {
    let (status, body) = post(
        client,
        "/wishes",
        Some(token),
        json!({
            "name": "Bicycle",
            "link": "https://shop.example.com/bicycle",
            "image": "https://shop.example.com/bicycle.png",
            "price": price,
            "description": "A red one.",
        }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    body["wish"]["id"].as_i64().expect("wish id")
}

async fn offer(client: &Client, token: &str, item_id: i64, amount: &str) -> (Status, Value) {
    post(
        client,
        "/offers",
        Some(token),
        json!({ "amount": amount, "itemId": item_id }),
    )
    .await
}

#[rocket::async_test]
async fn signup_returns_account_without_password() {
    let client = client().await;
    let (status, body) = post(
        &client,
        "/signup",
        None,
        json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "correct horse",
        }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["user"].get("password").is_none());
}

#[rocket::async_test]
async fn duplicate_signup_conflicts() {
    let client = client().await;
    register(&client, "alice").await;
    let (status, body) = post(
        &client,
        "/signup",
        None,
        json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "correct horse",
        }),
    )
    .await;
    assert_eq!(status, Status::Conflict);
    assert_eq!(body["error"]["status"], "USER_ALREADY_EXISTS");
}

#[rocket::async_test]
async fn signin_with_wrong_password_is_unauthorized() {
    let client = client().await;
    register(&client, "alice").await;
    let (status, body) = post(
        &client,
        "/signin",
        None,
        json!({ "username": "alice", "password": "wrong" }),
    )
    .await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body["error"]["status"], "INVALID_CREDENTIALS");
}

#[rocket::async_test]
async fn authenticated_routes_need_a_valid_token() {
    let client = client().await;
    let res = client.get("/v0/users/me").dispatch().await;
    assert_eq!(res.status(), Status::Forbidden);
    let (status, _) = get(&client, "/users/me", "not-a-token").await;
    assert_eq!(status, Status::Forbidden);
}

#[rocket::async_test]
async fn profile_can_be_read_and_updated() {
    let client = client().await;
    let token = register(&client, "alice").await;
    let res = client
        .patch("/v0/users/me")
        .header(ContentType::JSON)
        .header(Header::new("X-Auth-Token", token.clone()))
        .body(json!({ "about": "Likes bicycles." }).to_string())
        .dispatch()
        .await;
    assert_eq!(res.status(), Status::Ok);

    let (status, body) = get(&client, "/users/alice", &token).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["user"]["about"], "Likes bicycles.");

    let (status, body) = get(&client, "/users/nobody", &token).await;
    assert_eq!(status, Status::NotFound);
    assert_eq!(body["error"]["status"], "USER_NOT_FOUND");
}

#[rocket::async_test]
async fn offers_fill_a_wish_up_to_its_price() {
    let client = client().await;
    let owner = register(&client, "owner").await;
    let friend = register(&client, "friend").await;
    let latecomer = register(&client, "latecomer").await;
    let wish = create_wish(&client, &owner, "100.00").await;

    let (status, body) = offer(&client, &friend, wish, "100.00").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["offer"]["amount"], "100.00");
    assert_eq!(body["offer"]["hidden"], false);

    let (status, body) = offer(&client, &latecomer, wish, "0.01").await;
    assert_eq!(status, Status::Forbidden);
    assert_eq!(body["error"]["status"], "EXCEEDS_REMAINING");

    let (status, body) = get(&client, &format!("/wishes/{}", wish), &friend).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["wish"]["raised"], "100.00");
    assert_eq!(body["owner"]["username"], "owner");
    assert_eq!(body["offers"].as_array().map(Vec::len), Some(1));
}

#[rocket::async_test]
async fn owner_cannot_offer_on_own_wish() {
    let client = client().await;
    let owner = register(&client, "owner").await;
    let wish = create_wish(&client, &owner, "100.00").await;

    let (status, body) = offer(&client, &owner, wish, "10.00").await;
    assert_eq!(status, Status::Forbidden);
    assert_eq!(body["error"]["status"], "OWN_WISH");
}

#[rocket::async_test]
async fn offer_on_missing_wish_is_not_found() {
    let client = client().await;
    let friend = register(&client, "friend").await;

    let (status, body) = offer(&client, &friend, 42, "10.00").await;
    assert_eq!(status, Status::NotFound);
    assert_eq!(body["error"]["status"], "WISH_NOT_FOUND");

    let (status, body) = get(&client, "/offers", &friend).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["offers"].as_array().map(Vec::len), Some(0));
}

#[rstest]
#[case::too_precise("1.005")]
#[case::negative("-5.00")]
#[case::not_a_number("ten")]
#[case::too_large("100000000")]
#[tokio::test]
async fn malformed_amount_fails_validation(#[case] amount: &str) {
    let client = client().await;
    let owner = register(&client, "owner").await;
    let friend = register(&client, "friend").await;
    let wish = create_wish(&client, &owner, "100.00").await;

    let (status, body) = offer(&client, &friend, wish, amount).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["error"]["status"], "VALIDATION_FAILED");
    assert!(body["error"]["description"]
        .as_str()
        .map_or(false, |d| d.starts_with("amount: ")));
}

#[rocket::async_test]
async fn single_offer_is_returned_with_its_full_graph() {
    let client = client().await;
    let owner = register(&client, "owner").await;
    let friend = register(&client, "friend").await;
    let wish = create_wish(&client, &owner, "50.00").await;
    let (_, body) = post(
        &client,
        "/offers",
        Some(&friend),
        json!({ "amount": "20.00", "hidden": true, "itemId": wish }),
    )
    .await;
    let id = body["offer"]["id"].as_i64().expect("offer id");

    let (status, body) = get(&client, &format!("/offers/{}", id), &friend).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body["offer"]["hidden"], true);
    assert_eq!(body["user"]["username"], "friend");
    assert_eq!(body["item"]["raised"], "20.00");
    assert_eq!(body["itemOwner"]["username"], "owner");
    assert_eq!(body["itemOffers"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["userWishes"].as_array().map(Vec::len), Some(0));

    let (status, body) = get(&client, "/offers", &friend).await;
    assert_eq!(status, Status::Ok);
    assert!(body["offers"][0].get("itemOwner").is_none());

    let (status, _) = get(&client, "/offers/999", &friend).await;
    assert_eq!(status, Status::NotFound);
}

#[rocket::async_test]
async fn openapi_document_is_served() {
    let client = client().await;
    let res = client.get("/v0/openapi.json").dispatch().await;
    assert_eq!(res.status(), Status::Ok);
    let body: Value = res.into_json().await.expect("openapi json");
    let paths = body["paths"].as_object().expect("paths object");
    assert!(paths.keys().any(|path| path.ends_with("/offers")));
}
