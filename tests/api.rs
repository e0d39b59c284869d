use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Extension, Router,
};
use club_registry::auth::generate_jwt;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

// Nothing below reaches the database, so the pool never connects.
fn app() -> Router {
    std::env::set_var("JWT_SECRET", "Y2x1YiByZWdpc3RyeSB0ZXN0IHNlY3JldA==");
    let pool = club_registry::connect_to_db("postgres://localhost/none").unwrap();
    club_registry::app("storage").layer(Extension(pool))
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_post(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn creating_a_request_requires_authentication() {
    let (status, json) = send(json_post("/api/request", r#"{"community": 1}"#)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["status"], 401);
}

#[tokio::test]
async fn invalid_tokens_are_rejected_even_on_public_reads() {
    let request = Request::builder()
        .uri("/api/club")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "invalid authentication token");
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    std::env::set_var("JWT_SECRET", "Y2x1YiByZWdpc3RyeSB0ZXN0IHNlY3JldA==");
    // default validation allows 60 seconds of leeway, so back-date well past it
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &club_registry::auth::Claims {
            user_id: 3,
            exp: jsonwebtoken::get_current_timestamp() - 3600,
        },
        &jsonwebtoken::EncodingKey::from_base64_secret("Y2x1YiByZWdpc3RyeSB0ZXN0IHNlY3JldA==")
            .unwrap(),
    )
    .unwrap();
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/membership/1")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn private_listings_reject_anonymous_callers() {
    for uri in ["/api/request", "/api/invitation"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn staff_only_writes_reject_anonymous_callers() {
    let cases = [
        (Method::POST, "/api/club"),
        (Method::PATCH, "/api/event/2"),
        (Method::DELETE, "/api/community/2"),
        (Method::POST, "/api/album-image"),
        (Method::PUT, "/api/membership/4/label"),
    ];
    for (method, uri) in cases {
        let request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let request = Request::builder()
        .uri("/api/nothing-here")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn issued_tokens_are_accepted_by_the_validator() {
    std::env::set_var("JWT_SECRET", "Y2x1YiByZWdpc3RyeSB0ZXN0IHNlY3JldA==");
    let token = generate_jwt(9, Duration::from_secs(300)).unwrap();
    let data = club_registry::auth::validate_jwt(&token).unwrap();
    assert_eq!(data.claims.user_id, 9);
}
