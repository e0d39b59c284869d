//! End-to-end checks against a migrated PostgreSQL database named by
//! `DATABASE_URL`. Every test returns early when the variable is not set.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Extension, Router,
};
use club_registry::{auth::generate_jwt, schema::*, DbPool};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::{json, Value};
use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

const SECRET: &str = "Y2x1YiByZWdpc3RyeSB0ZXN0IHNlY3JldA==";

fn unique(prefix: &str) -> String {
    static NEXT: AtomicU32 = AtomicU32::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!(
        "{prefix}-{}-{nanos}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn ids(json: &Value) -> Vec<i64> {
    json.as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_i64().unwrap())
        .collect()
}

fn codes(json: &Value) -> Vec<String> {
    json["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|e| e["code"].as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

struct Harness {
    app: Router,
    pool: DbPool,
}

fn harness() -> Option<Harness> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set, skipping");
        return None;
    };
    std::env::set_var("JWT_SECRET", SECRET);
    let pool = club_registry::connect_to_db(&url).unwrap();
    let app = club_registry::app("storage").layer(Extension(pool.clone()));
    Some(Harness { app, pool })
}

impl Harness {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send(self.app.clone(), request(method, uri, token, body)).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    async fn user(&self) -> (i32, String) {
        let conn = &mut self.pool.get().await.unwrap();
        let name = unique("user");
        let id = diesel::insert_into(users::table)
            .values((users::username.eq(&name), users::name.eq(&name)))
            .returning(users::id)
            .get_result::<i32>(conn)
            .await
            .unwrap();
        (id, generate_jwt(id, Duration::from_secs(600)).unwrap())
    }

    async fn lab(&self, token: &str, public: bool) -> i64 {
        let (status, json) = self
            .post(
                "/api/lab",
                Some(token),
                json!({
                    "name_th": unique("lab-th"),
                    "name_en": unique("lab-en"),
                    "is_publicly_visible": public,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["id"].as_i64().unwrap()
    }

    async fn event(&self, token: &str, public: bool) -> i64 {
        let (status, json) = self
            .post(
                "/api/event",
                Some(token),
                json!({
                    "name_th": unique("event-th"),
                    "name_en": unique("event-en"),
                    "is_publicly_visible": public,
                    "location": "Main hall",
                    "start_date": "2022-12-01",
                    "end_date": "2022-12-02",
                    "start_time": "09:00:00",
                    "end_time": "17:00:00",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["id"].as_i64().unwrap()
    }

    async fn community_event(&self, token: &str, created_under: i64) -> i64 {
        let (status, json) = self
            .post(
                "/api/community-event",
                Some(token),
                json!({
                    "name_th": unique("ce-th"),
                    "name_en": unique("ce-en"),
                    "location": "Lab room",
                    "start_date": "2022-12-01",
                    "end_date": "2022-12-01",
                    "start_time": "13:00:00",
                    "end_time": "15:00:00",
                    "created_under": created_under,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["is_approved"], true);
        json["id"].as_i64().unwrap()
    }

    async fn album(&self, token: &str, community: i64) -> i64 {
        let (status, json) = self
            .post(
                "/api/album",
                Some(token),
                json!({ "name": unique("album"), "community": community }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["id"].as_i64().unwrap()
    }

    async fn positions(&self, user_id: i32, community_id: i64) -> Vec<i32> {
        let conn = &mut self.pool.get().await.unwrap();
        memberships::table
            .filter(memberships::user_id.eq(user_id))
            .filter(memberships::community_id.eq(community_id as i32))
            .select(memberships::position)
            .load::<i32>(conn)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn anonymous_reads_see_only_public_parents() {
    let Some(h) = harness() else { return };
    let (_, head) = h.user().await;

    let public_lab = h.lab(&head, true).await;
    let hidden_lab = h.lab(&head, false).await;
    let public_event = h.event(&head, true).await;
    let hidden_event = h.event(&head, false).await;
    let public_album = h.album(&head, public_lab).await;
    let hidden_album = h.album(&head, hidden_lab).await;
    for event in [public_event, hidden_event] {
        let (status, _) = h
            .post(
                "/api/comment",
                Some(&head),
                json!({ "text": "see you", "written_by": "head", "event": event }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, communities) = h.get("/api/community", None).await;
    let visible = ids(&communities);
    assert!(visible.contains(&public_lab) && visible.contains(&public_event));
    assert!(!visible.contains(&hidden_lab) && !visible.contains(&hidden_event));

    let (_, events) = h.get("/api/event", None).await;
    let visible = ids(&events);
    assert!(visible.contains(&public_event));
    assert!(!visible.contains(&hidden_event));

    let (_, albums) = h.get("/api/album", None).await;
    let visible = ids(&albums);
    assert!(visible.contains(&public_album));
    assert!(!visible.contains(&hidden_album));

    // caller filters narrow the public set, they never widen it
    let (_, albums) = h
        .get(&format!("/api/album?community={hidden_lab}"), None)
        .await;
    assert!(ids(&albums).is_empty());
    let (_, albums) = h
        .get(&format!("/api/album?community={hidden_lab}"), Some(&head))
        .await;
    assert_eq!(ids(&albums), [hidden_album]);

    let (_, comments) = h
        .get(&format!("/api/comment?event={hidden_event}"), None)
        .await;
    assert!(ids(&comments).is_empty());
    let (_, comments) = h
        .get(&format!("/api/comment?event={public_event}"), None)
        .await;
    assert_eq!(ids(&comments).len(), 1);

    let (status, _) = h.get(&format!("/api/lab/{hidden_lab}"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = h.get(&format!("/api/lab/{hidden_lab}"), Some(&head)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn accepted_request_creates_a_single_member() {
    let Some(h) = harness() else { return };
    let (_, head) = h.user().await;
    let (applicant_id, applicant) = h.user().await;
    let lab = h.lab(&head, true).await;

    let (status, json) = h
        .post("/api/request", Some(&applicant), json!({ "community": lab }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["status"], "waiting");
    let uri = format!("/api/request/{}", json["id"]);

    // applicants do not answer their own requests
    let (status, _) = h
        .call(Method::PATCH, &uri, Some(&applicant), Some(json!({ "status": "accepted" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = h
        .call(Method::PATCH, &uri, Some(&head), Some(json!({ "status": "accepted" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["status"], "accepted");
    assert_eq!(h.positions(applicant_id, lab).await, [0]);

    let (status, json) = h
        .call(Method::PATCH, &uri, Some(&head), Some(json!({ "status": "waiting" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["message"],
        "Request statuses are not able to be updated to waiting."
    );

    let (status, _) = h
        .call(Method::PATCH, &uri, Some(&head), Some(json!({ "status": "accepted" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.positions(applicant_id, lab).await, [0]);

    let (status, json) = h
        .post("/api/request", Some(&applicant), json!({ "community": lab }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(codes(&json), ["membership_exists"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_leave_one_waiting() {
    let Some(h) = harness() else { return };
    let (_, head) = h.user().await;
    let (applicant_id, applicant) = h.user().await;
    let lab = h.lab(&head, true).await;

    let mut handles = Vec::new();
    for _ in 0..12 {
        let post = request(
            Method::POST,
            "/api/request",
            Some(&applicant),
            Some(json!({ "community": lab })),
        );
        handles.push(tokio::spawn(send(h.app.clone(), post)));
    }
    let mut created = 0;
    for handle in handles {
        let (status, json) = handle.await.unwrap();
        match status {
            StatusCode::CREATED => created += 1,
            StatusCode::BAD_REQUEST => assert_eq!(codes(&json), ["request_exists"]),
            other => panic!("unexpected {other}: {json}"),
        }
    }
    assert_eq!(created, 1);

    let conn = &mut h.pool.get().await.unwrap();
    let waiting = requests::table
        .filter(requests::user_id.eq(applicant_id))
        .filter(requests::community_id.eq(lab as i32))
        .count()
        .get_result::<i64>(conn)
        .await
        .unwrap();
    assert_eq!(waiting, 1);
}

#[tokio::test]
async fn deletes_respect_kind_and_protected_parents() {
    let Some(h) = harness() else { return };
    let (_, head) = h.user().await;
    let lab = h.lab(&head, false).await;
    let community_event = h.community_event(&head, lab).await;

    let (status, _) = h
        .call(Method::DELETE, &format!("/api/club/{lab}"), Some(&head), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h
        .call(Method::DELETE, &format!("/api/lab/{lab}"), Some(&head), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = h.get(&format!("/api/lab/{lab}"), Some(&head)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = h
        .call(
            Method::DELETE,
            &format!("/api/community-event/{community_event}"),
            Some(&head),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = h
        .call(Method::DELETE, &format!("/api/lab/{lab}"), Some(&head), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn albums_follow_placement_rules() {
    let Some(h) = harness() else { return };
    let (_, head) = h.user().await;
    let lab = h.lab(&head, false).await;
    let other_lab = h.lab(&head, false).await;
    let community_event = h.community_event(&head, lab).await;

    let (status, json) = h
        .post(
            "/api/album",
            Some(&head),
            json!({ "name": unique("album"), "community": community_event }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(codes(&json), ["hierarchy_error"]);

    let (status, json) = h
        .post(
            "/api/album",
            Some(&head),
            json!({
                "name": unique("album"),
                "community": other_lab,
                "community_event": community_event,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(codes(&json), ["hierarchy_error"]);

    let (status, json) = h
        .post(
            "/api/album",
            Some(&head),
            json!({
                "name": unique("album"),
                "community": lab,
                "community_event": community_event,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["community_event_id"], community_event);
}

#[tokio::test]
async fn anonymous_comments_need_a_public_event() {
    let Some(h) = harness() else { return };
    let (author_id, author) = h.user().await;
    let public_event = h.event(&author, true).await;
    let hidden_event = h.event(&author, false).await;
    let lab = h.lab(&author, true).await;
    let comment = |event: i64| json!({ "text": "nice", "written_by": "guest", "event": event });

    let (status, _) = h.post("/api/comment", None, comment(hidden_event)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = h.post("/api/comment", None, comment(public_event)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["created_by"], Value::Null);

    let (status, json) = h
        .post("/api/comment", Some(&author), comment(hidden_event))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["created_by"], author_id);

    let (status, json) = h.post("/api/comment", Some(&author), comment(lab)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(codes(&json), ["hierarchy_error"]);
}

#[tokio::test]
async fn album_images_are_retrievable_by_id() {
    let Some(h) = harness() else { return };
    let (_, head) = h.user().await;
    let public_album = h.album(&head, h.lab(&head, true).await).await;
    let hidden_album = h.album(&head, h.lab(&head, false).await).await;

    let mut images = Vec::new();
    for album in [public_album, hidden_album] {
        let (status, json) = h
            .post(
                "/api/album-image",
                Some(&head),
                json!({ "album": album, "file_name": "photo.png" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        let id = json["id"].as_i64().unwrap();
        assert_eq!(json["image"], format!("storage/album/{album}/{id}.png"));
        images.push(id);
    }

    let (status, json) = h
        .get(&format!("/api/album-image/{}", images[0]), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["album_id"], public_album);

    let uri = format!("/api/album-image/{}", images[1]);
    let (status, _) = h.get(&uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for _ in 0..2 {
        let (status, _) = h.call(Method::DELETE, &uri, Some(&head), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let (status, _) = h.get(&uri, Some(&head)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn creation_reports_taken_names_with_placement_errors() {
    let Some(h) = harness() else { return };
    let (_, head) = h.user().await;
    let lab = h.lab(&head, false).await;
    let (_, existing) = h.get(&format!("/api/lab/{lab}"), Some(&head)).await;

    let (status, json) = h
        .post(
            "/api/club",
            Some(&head),
            json!({
                "name_th": existing["name_th"],
                "name_en": unique("club-en"),
                "room": "A101",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let codes = codes(&json);
    assert!(codes.contains(&"unique".to_string()), "{json}");
    assert!(codes.contains(&"unofficial_club_limitations".to_string()), "{json}");
}
