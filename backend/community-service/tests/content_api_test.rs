//! HTTP tests for submitting, listing, upvoting and deleting community content.

mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{json, Value};

use common::{bearer, default_state, init_app, limited_state, token};
use community_service::models::{ContentId, Role};
use community_service::services::RateLimitConfig;

#[actix_web::test]
async fn member_creates_unverified_tip() {
    let app = init_app(default_state()).await;
    let martin = token("user-martin", "Martin K.", Role::Member);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/cities/bratislava/content")
            .insert_header(bearer(&martin))
            .set_json(json!({
                "type": "tip",
                "content": "Download the IDS BK app before you arrive!"
            }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["city_id"], "bratislava");
    assert_eq!(body["kind"], "tip");
    assert_eq!(body["author_id"], "user-martin");
    assert_eq!(body["author_display_name"], "Martin K.");
    assert_eq!(body["upvote_count"], 0);
    assert_eq!(body["verified"], false);
}

#[actix_web::test]
async fn anonymous_create_is_forbidden() {
    let app = init_app(default_state()).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/cities/porto/content")
            .set_json(json!({"kind": "tip", "text": "hello"}))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[actix_web::test]
async fn bad_token_is_rejected() {
    let app = init_app(default_state()).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/cities/porto/content")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .set_json(json!({"kind": "tip", "text": "hello"}))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn unknown_city_persists_nothing() {
    let state = default_state();
    let app = init_app(state.clone()).await;
    let member = token("user-1", "Jana S.", Role::Member);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/cities/atlantis/content")
            .insert_header(bearer(&member))
            .set_json(json!({"kind": "tip", "text": "hello"}))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "UNKNOWN_CITY");
    assert!(state.store.is_empty());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/cities/atlantis/content")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn empty_text_and_bad_kind_are_invalid() {
    let state = default_state();
    let app = init_app(state.clone()).await;
    let member = token("user-1", "Jana S.", Role::Member);

    for payload in [
        json!({"kind": "warning", "text": "   "}),
        json!({"kind": "warning"}),
        json!({"kind": "Warning", "text": "case matters"}),
        json!({"kind": "photo", "text": "no media url"}),
    ] {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/cities/porto/content")
                .insert_header(bearer(&member))
                .set_json(&payload)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", payload);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "INVALID_CONTENT");
    }

    assert!(state.store.is_empty());
}

#[actix_web::test]
async fn photo_with_media_url_is_accepted() {
    let app = init_app(default_state()).await;
    let member = token("user-2", "Luca", Role::Member);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/cities/rome/content")
            .insert_header(bearer(&member))
            .set_json(json!({
                "kind": "photo",
                "media_url": "https://cdn.example.com/rome/validator.jpg",
                "caption": "Validator on bus 64"
            }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["body"]["format"], "photo");
    assert_eq!(body["body"]["url"], "https://cdn.example.com/rome/validator.jpg");
}

#[actix_web::test]
async fn list_filters_by_city_and_kind_newest_first() {
    let app = init_app(default_state()).await;
    let member = token("user-carlos", "Carlos M.", Role::Member);

    let submissions = [
        ("porto", "warning", "Historic tram line 1 needs a different ticket"),
        ("porto", "tip", "Andante cards are rechargeable"),
        ("porto", "warning", "Validate every time you board the metro"),
        ("rome", "warning", "Pickpockets on line 64"),
    ];
    for (city, kind, text) in submissions {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/cities/{}/content", city))
                .insert_header(bearer(&member))
                .set_json(json!({"kind": kind, "text": text}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/cities/porto/content?type=warning")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let items: Vec<Value> = test::read_body_json(resp).await;

    assert_eq!(items.len(), 2);
    assert!(items
        .iter()
        .all(|i| i["city_id"] == "porto" && i["kind"] == "warning"));

    // Newest first, ties broken by id ascending.
    for pair in items.windows(2) {
        let a = pair[0]["created_at"].as_str().unwrap();
        let b = pair[1]["created_at"].as_str().unwrap();
        let a = chrono::DateTime::parse_from_rfc3339(a).unwrap();
        let b = chrono::DateTime::parse_from_rfc3339(b).unwrap();
        assert!(a > b || (a == b && pair[0]["id"].as_u64() < pair[1]["id"].as_u64()));
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/cities/porto/content")
            .to_request(),
    )
    .await;
    let all: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(all.len(), 3);
}

#[actix_web::test]
async fn upvote_and_delete_unknown_id_is_not_found() {
    let app = init_app(default_state()).await;
    let member = token("user-1", "Jana S.", Role::Member);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/content/9999/upvote")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri("/api/v1/content/9999")
            .insert_header(bearer(&member))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn bratislava_contribution_lifecycle() {
    let state = default_state();
    let app = init_app(state.clone()).await;
    let martin = token("user-martin", "Martin", Role::Member);
    let jana = token("user-jana", "Jana", Role::Member);
    let moderator = token("mod-eva", "Eva", Role::Moderator);

    // Member creates a tip.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/cities/bratislava/content")
            .insert_header(bearer(&martin))
            .set_json(json!({
                "kind": "tip",
                "text": "Ticket machines at Hlavná stanica have long queues"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_u64().unwrap();
    assert_eq!(created["upvote_count"], 0);
    assert_eq!(created["verified"], false);

    // 24 upvotes.
    let mut last = Value::Null;
    for _ in 0..24 {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/content/{}/upvote", id))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        last = test::read_body_json(resp).await;
    }
    assert_eq!(last["upvote_count"], 24);

    // Moderator verifies, twice.
    let verify = |tok: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/v1/admin/content/{}/verify", id))
            .insert_header(bearer(tok))
            .to_request()
    };
    let resp = test::call_service(&app, verify(&moderator)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first: Value = test::read_body_json(resp).await;
    assert_eq!(first["verified"], true);
    assert_eq!(first["upvote_count"], 24);

    let resp = test::call_service(&app, verify(&moderator)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second: Value = test::read_body_json(resp).await;
    assert_eq!(first, second);

    // No longer pending.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/admin/pending")
            .insert_header(bearer(&moderator))
            .to_request(),
    )
    .await;
    let pending: Vec<Value> = test::read_body_json(resp).await;
    assert!(pending.iter().all(|p| p["id"].as_u64() != Some(id)));

    // Non-author member cannot delete.
    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/content/{}", id))
            .insert_header(bearer(&jana))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/content/{}", id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Author deletes.
    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/content/{}", id))
            .insert_header(bearer(&martin))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/content/{}", id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    // A new item never reuses the deleted id.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/cities/bratislava/content")
            .insert_header(bearer(&martin))
            .set_json(json!({"kind": "warning", "text": "Night buses run hourly"}))
            .to_request(),
    )
    .await;
    let next: Value = test::read_body_json(resp).await;
    assert!(next["id"].as_u64().unwrap() > id);
}

#[actix_web::test]
async fn oversized_anonymous_submission_is_forbidden_not_invalid() {
    let app = init_app(default_state()).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/cities/porto/content")
            .set_json(json!({"kind": "tip", "text": "x".repeat(2_500)}))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[actix_web::test]
async fn non_numeric_id_is_json_not_found() {
    let app = init_app(default_state()).await;

    let req = test::TestRequest::get().uri("/api/v1/content/abc").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[actix_web::test]
async fn anonymous_role_token_cannot_delete_own_subject() {
    let state = default_state();
    let app = init_app(state.clone()).await;
    let member = token("user-7", "Ana", Role::Member);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/cities/porto/content")
            .insert_header(bearer(&member))
            .set_json(json!({"kind": "tip", "text": "Andante cards work on the metro"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_u64().unwrap();

    let demoted = token("user-7", "Ana", Role::Anonymous);
    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/content/{}", id))
            .insert_header(bearer(&demoted))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(state.store.len(), 1);
}

#[actix_web::test]
async fn upvote_burst_is_rate_limited() {
    let state = limited_state(RateLimitConfig {
        creates_per_minute: 10,
        upvotes_per_minute: 3,
    });
    let app = init_app(state.clone()).await;
    let member = token("user-1", "Jana S.", Role::Member);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/cities/rome/content")
            .insert_header(bearer(&member))
            .set_json(json!({"kind": "tip", "text": "Validate on the bus"}))
            .to_request(),
    )
    .await;
    let created: Value = test::read_body_json(resp).await;
    let upvote_uri = format!("/api/v1/content/{}/upvote", created["id"]);

    for _ in 0..3 {
        let req = test::TestRequest::post().uri(&upvote_uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::post().uri(&upvote_uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("Retry-After"));
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    // A signed-in caller has a bucket of their own.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&upvote_uri)
            .insert_header(bearer(&member))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let id = created["id"].as_u64().unwrap();
    let item = state.contents.get(ContentId(id)).unwrap();
    assert_eq!(item.upvote_count, 4);
}
