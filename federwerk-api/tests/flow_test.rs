//! End-to-end flow through the router: signup, login, session cookie,
//! authoring, reads, logout. No socket; requests go through `oneshot`.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use federwerk_api::server::{self, ServerState};
use federwerk_common::model::session::SessionCodec;
use federwerk_db::client::DbClient;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database opens");

    let db_client = DbClient::new(pool);
    db_client
        .init_schema()
        .await
        .expect("schema bootstrap succeeds");

    let state = ServerState {
        db_client: Arc::new(db_client),
        session_codec: Arc::new(SessionCodec::new(b"integration-secret")),
    };

    server::routes().with_state(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn form_post_with_cookie(uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, cookie)
        .body(Body::from(body.to_owned()))
        .unwrap()
}

/// The `name=value` pair from the response's Set-Cookie header.
fn session_cookie(response: &Response<axum::body::Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response sets the session cookie")
        .to_str()
        .unwrap();
    let (pair, _attributes) = set_cookie.split_once(';').unwrap_or((set_cookie, ""));

    assert!(pair.starts_with("session_token="));
    pair.to_owned()
}

async fn json_body(response: Response<axum::body::Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn signup_login_author_read_flow() {
    let app = app().await;

    // signup redirects to the login page
    let response = app
        .clone()
        .oneshot(form_post(
            "/signup",
            "username=bob&password=pw&email=bob%40x.com",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    // a wrong password is rejected without a cookie
    let response = app
        .clone()
        .oneshot(form_post("/login", "username=bob&password=nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    // the right password sets the session cookie and redirects home
    let response = app
        .clone()
        .oneshot(form_post("/login", "username=bob&password=pw"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let cookie = session_cookie(&response);

    // the home bundle carries the identity
    let response = app.clone().oneshot(get_with_cookie("/", &cookie)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let home = json_body(response).await;
    assert_eq!(home["user"]["username"], "bob");
    assert_eq!(home["posts"].as_array().unwrap().len(), 0);

    // authoring a post
    let response = app
        .clone()
        .oneshot(form_post_with_cookie("/post", &cookie, "title=T&body=B"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/");

    // visible anonymously, attributed to bob
    let response = app.clone().oneshot(get("/")).await.unwrap();
    let home = json_body(response).await;
    assert!(home["user"].is_null());
    let posts = home["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["username"], "bob");
    assert_eq!(posts[0]["title"], "T");
    let id = posts[0]["id"].as_i64().unwrap();

    // single post read
    let response = app.clone().oneshot(get(&format!("/post/{id}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let post = json_body(response).await;
    assert_eq!(post["title"], "T");
    assert_eq!(post["body"], "B");

    // unknown post id
    let response = app.clone().oneshot(get("/post/9999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signup_reports_every_violation_at_once() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(form_post("/signup", "username=&password=&email=not-an-address"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let rejection = json_body(response).await;
    assert_eq!(rejection["username"], "");
    assert_eq!(rejection["email"], "not-an-address");
    assert!(rejection["errors"]["username"].is_string());
    assert!(rejection["errors"]["password"].is_string());
    assert!(rejection["errors"]["email"].is_string());
}

#[tokio::test]
async fn duplicate_signup_keeps_one_user() {
    let app = app().await;

    let body = "username=carol&password=pw&email=carol%40x.com";
    let response = app.clone().oneshot(form_post("/signup", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let response = app.clone().oneshot(form_post("/signup", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let rejection = json_body(response).await;
    assert!(rejection["errors"]["username"].is_string());

    // the taken username is reported alongside other field errors
    let response = app
        .clone()
        .oneshot(form_post("/signup", "username=carol&password=&email=bad"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let rejection = json_body(response).await;
    assert!(rejection["errors"]["username"].is_string());
    assert!(rejection["errors"]["password"].is_string());
    assert!(rejection["errors"]["email"].is_string());

    // the first signup still logs in
    let response = app
        .clone()
        .oneshot(form_post("/login", "username=carol&password=pw"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn anonymous_authoring_is_redirected_with_a_prompt() {
    let app = app().await;

    for request in [
        get("/post/new"),
        form_post("/post", "title=T&body=B"),
    ] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/?error=Please%20log%20in%20first"
        );
    }

    // no row was inserted
    let response = app.clone().oneshot(get("/")).await.unwrap();
    let home = json_body(response).await;
    assert_eq!(home["posts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn tampered_cookie_is_anonymous() {
    let app = app().await;

    app.clone()
        .oneshot(form_post(
            "/signup",
            "username=dave&password=pw&email=dave%40x.com",
        ))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(form_post("/login", "username=dave&password=pw"))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    let mut tampered = cookie.into_bytes();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;
    let tampered = String::from_utf8(tampered).unwrap();

    let response = app
        .clone()
        .oneshot(get_with_cookie("/", &tampered))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let home = json_body(response).await;
    assert!(home["user"].is_null());
}

#[tokio::test]
async fn empty_post_fields_are_rejected() {
    let app = app().await;

    app.clone()
        .oneshot(form_post(
            "/signup",
            "username=erin&password=pw&email=erin%40x.com",
        ))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(form_post("/login", "username=erin&password=pw"))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    // "+" decodes to a space, so both fields are blank after trimming
    let response = app
        .clone()
        .oneshot(form_post_with_cookie("/post", &cookie, "title=+&body="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let rejection = json_body(response).await;
    assert!(rejection["errors"]["title"].is_string());
    assert!(rejection["errors"]["body"].is_string());

    let response = app.clone().oneshot(get("/")).await.unwrap();
    let home = json_body(response).await;
    assert_eq!(home["posts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn logout_clears_the_cookie_and_is_idempotent() {
    let app = app().await;

    // works with no session at all
    let response = app.clone().oneshot(get("/logout")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/");

    app.clone()
        .oneshot(form_post(
            "/signup",
            "username=finn&password=pw&email=finn%40x.com",
        ))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(form_post("/login", "username=finn&password=pw"))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    let response = app
        .clone()
        .oneshot(get_with_cookie("/logout", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("session_token="));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = app().await;

    let response = app.clone().oneshot(get("/no/such/route")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.clone().oneshot(get("/post/not-a-number")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
