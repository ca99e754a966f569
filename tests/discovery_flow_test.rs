mod common;

use actix_web::test;
use bson::Bson;
use chrono::Utc;
use serde_json::{json, Value};
use serial_test::serial;

use common::{bearer_token, itinerary, profile, TestApp};
use tripmate_api::models::itinerary::TripItinerary;
use tripmate_api::models::user::{Subscription, SubscriptionTier};
use tripmate_api::routes::discovery::{MATCH_SETUP_ISSUE, SWIPE_UNAVAILABLE};
use tripmate_api::services::config::EngineConfig;
use tripmate_api::store::DiscoveryStore;

async fn seed_traveler(app: &TestApp, uid: &str, itin: &TripItinerary) {
    app.store.upsert_user(&profile(uid, uid)).await.unwrap();
    app.store.insert_itinerary(itin).await.unwrap();
}

#[actix_rt::test]
#[serial]
async fn mutual_accepts_create_a_single_connection() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    seed_traveler(&test_app, "alice", &itinerary("itin_alice", "alice", "Paris", 100, 110)).await;
    seed_traveler(&test_app, "bob", &itinerary("itin_bob", "bob", "Paris", 102, 112)).await;

    // Alice finds Bob.
    let req = test::TestRequest::post()
        .uri("/api/discovery/search")
        .insert_header(("Authorization", bearer_token("alice", "alice@example.com")))
        .insert_header(("X-Device-Id", "device_alice"))
        .set_json(json!({ "itineraryId": "itin_alice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["candidate"]["_id"], "itin_bob");

    // Alice likes Bob's trip; nothing reciprocal yet.
    let req = test::TestRequest::post()
        .uri("/api/discovery/accept")
        .insert_header(("Authorization", bearer_token("alice", "alice@example.com")))
        .insert_header(("X-Device-Id", "device_alice"))
        .set_json(json!({ "candidateId": "itin_bob" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["outcome"], "no_match");
    assert!(body["data"]["next"].is_null());

    let bob_itin = test_app.store.get_itinerary("itin_bob").await.unwrap().unwrap();
    assert!(bob_itin.has_liked("alice"));

    // Bob finds Alice and accepts back.
    let req = test::TestRequest::post()
        .uri("/api/discovery/search")
        .insert_header(("Authorization", bearer_token("bob", "bob@example.com")))
        .insert_header(("X-Device-Id", "device_bob"))
        .set_json(json!({ "itineraryId": "itin_bob" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["candidate"]["_id"], "itin_alice");

    let req = test::TestRequest::post()
        .uri("/api/discovery/accept")
        .insert_header(("Authorization", bearer_token("bob", "bob@example.com")))
        .insert_header(("X-Device-Id", "device_bob"))
        .set_json(json!({ "candidateId": "itin_alice" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["outcome"], "matched");

    let connection = &body["data"]["connection"];
    assert_eq!(connection["_id"], "alice_bob");
    assert_eq!(connection["users"], json!(["alice", "bob"]));
    assert_eq!(connection["itineraryIds"], json!(["itin_alice", "itin_bob"]));
    assert_eq!(connection["unreadCounts"], json!({ "alice": 0, "bob": 0 }));
    assert_eq!(connection["itineraries"]["alice"]["_id"], "itin_alice");
    assert_eq!(connection["itineraries"]["bob"]["_id"], "itin_bob");

    // Both sides list the same connection.
    for uid in ["alice", "bob"] {
        let req = test::TestRequest::get()
            .uri("/api/connections")
            .insert_header(("Authorization", bearer_token(uid, "t@example.com")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["_id"], "alice_bob");
    }
    assert_eq!(test_app.store.connection_count(), 1);
}

#[actix_rt::test]
#[serial]
async fn quota_exhaustion_blocks_with_the_generic_message() {
    let config = EngineConfig {
        daily_swipe_limit: 2,
        ..EngineConfig::default()
    };
    let test_app = TestApp::with_config(config);
    let app = test::init_service(test_app.create_app()).await;

    seed_traveler(&test_app, "carol", &itinerary("itin_carol", "carol", "Lisbon", 50, 60)).await;
    seed_traveler(&test_app, "u1", &itinerary("d1", "u1", "Lisbon", 50, 55)).await;
    seed_traveler(&test_app, "u2", &itinerary("d2", "u2", "Lisbon", 50, 56)).await;
    seed_traveler(&test_app, "u3", &itinerary("d3", "u3", "Lisbon", 50, 57)).await;

    let req = test::TestRequest::post()
        .uri("/api/discovery/search")
        .insert_header(("Authorization", bearer_token("carol", "carol@example.com")))
        .insert_header(("X-Device-Id", "device_carol"))
        .set_json(json!({ "itineraryId": "itin_carol" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["count"], 3);
    assert_eq!(body["data"]["candidate"]["_id"], "d1");

    // Two swipes fit the limit.
    for (candidate, next) in [("d1", "d2"), ("d2", "d3")] {
        let req = test::TestRequest::post()
            .uri("/api/discovery/accept")
            .insert_header(("Authorization", bearer_token("carol", "carol@example.com")))
            .insert_header(("X-Device-Id", "device_carol"))
            .set_json(json!({ "candidateId": candidate }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["next"]["_id"], next);
    }

    // The third is refused and the cursor stays put.
    let req = test::TestRequest::post()
        .uri("/api/discovery/accept")
        .insert_header(("Authorization", bearer_token("carol", "carol@example.com")))
        .insert_header(("X-Device-Id", "device_carol"))
        .set_json(json!({ "candidateId": "d3" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], SWIPE_UNAVAILABLE);

    let req = test::TestRequest::get()
        .uri("/api/discovery/current")
        .insert_header(("Authorization", bearer_token("carol", "carol@example.com")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["candidate"]["_id"], "d3");

    let blocked = test_app.store.get_itinerary("d3").await.unwrap().unwrap();
    assert!(blocked.likes.is_empty());

    let req = test::TestRequest::get()
        .uri("/api/discovery/quota")
        .insert_header(("Authorization", bearer_token("carol", "carol@example.com")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["limit"], 2);
    assert_eq!(body["data"]["remaining"], 0);
    assert_eq!(body["data"]["limitReached"], true);
    assert_eq!(body["data"]["premium"], false);
}

#[actix_rt::test]
#[serial]
async fn active_premium_swipes_past_the_limit() {
    let config = EngineConfig {
        daily_swipe_limit: 1,
        ..EngineConfig::default()
    };
    let test_app = TestApp::with_config(config);
    let app = test::init_service(test_app.create_app()).await;

    let mut carol = profile("carol", "carol");
    carol.subscription = Some(Subscription {
        tier: SubscriptionTier::Premium,
        end_date: Some(Bson::Int64(Utc::now().timestamp() + 86_400)),
    });
    test_app.store.upsert_user(&carol).await.unwrap();
    test_app
        .store
        .insert_itinerary(&itinerary("itin_carol", "carol", "Lisbon", 50, 60))
        .await
        .unwrap();
    seed_traveler(&test_app, "u1", &itinerary("d1", "u1", "Lisbon", 50, 55)).await;
    seed_traveler(&test_app, "u2", &itinerary("d2", "u2", "Lisbon", 50, 56)).await;

    let req = test::TestRequest::post()
        .uri("/api/discovery/search")
        .insert_header(("Authorization", bearer_token("carol", "carol@example.com")))
        .insert_header(("X-Device-Id", "device_carol"))
        .set_json(json!({ "itineraryId": "itin_carol" }))
        .to_request();
    test::call_service(&app, req).await;

    for candidate in ["d1", "d2"] {
        let req = test::TestRequest::post()
            .uri("/api/discovery/accept")
            .insert_header(("Authorization", bearer_token("carol", "carol@example.com")))
            .insert_header(("X-Device-Id", "device_carol"))
            .set_json(json!({ "candidateId": candidate }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true, "premium swipe on {} was blocked", candidate);
    }

    let req = test::TestRequest::get()
        .uri("/api/discovery/quota")
        .insert_header(("Authorization", bearer_token("carol", "carol@example.com")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["premium"], true);
    assert_eq!(body["data"]["limitReached"], false);
    assert!(body["data"]["remaining"].is_null());
}

#[actix_rt::test]
#[serial]
async fn rejection_hides_candidates_per_device_until_cleared() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    seed_traveler(&test_app, "dana", &itinerary("itin_dana", "dana", "Oslo", 10, 20)).await;
    seed_traveler(&test_app, "u1", &itinerary("itin_x", "u1", "Oslo", 12, 18)).await;

    let search = |device: &str| {
        test::TestRequest::post()
            .uri("/api/discovery/search")
            .insert_header(("Authorization", bearer_token("dana", "dana@example.com")))
            .insert_header(("X-Device-Id", device.to_string()))
            .set_json(json!({ "itineraryId": "itin_dana" }))
            .to_request()
    };

    let resp = test::call_service(&app, search("tablet")).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["candidate"]["_id"], "itin_x");

    let req = test::TestRequest::post()
        .uri("/api/discovery/reject")
        .insert_header(("Authorization", bearer_token("dana", "dana@example.com")))
        .insert_header(("X-Device-Id", "tablet"))
        .set_json(json!({ "candidateId": "itin_x" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["outcome"], "rejected");
    assert!(body["data"]["next"].is_null());

    // Gone for this device, and the swipe still counted.
    let resp = test::call_service(&app, search("tablet")).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["count"], 0);
    assert!(body["data"]["candidate"].is_null());

    let req = test::TestRequest::get()
        .uri("/api/discovery/quota")
        .insert_header(("Authorization", bearer_token("dana", "dana@example.com")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["remaining"], 9);

    // A different device has its own history.
    let resp = test::call_service(&app, search("phone")).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["count"], 1);

    // Clearing the tablet's history resurfaces the trip there.
    let req = test::TestRequest::delete()
        .uri("/api/discovery/viewed")
        .insert_header(("Authorization", bearer_token("dana", "dana@example.com")))
        .insert_header(("X-Device-Id", "tablet"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, search("tablet")).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["candidate"]["_id"], "itin_x");
}

#[actix_rt::test]
#[serial]
async fn connection_write_failure_reports_match_failed_and_retries_clean() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    seed_traveler(&test_app, "ed", &itinerary("itin_ed", "ed", "Rome", 30, 40)).await;
    seed_traveler(&test_app, "fay", &itinerary("itin_fay", "fay", "Rome", 32, 42)).await;

    // Ed likes Fay first.
    let req = test::TestRequest::post()
        .uri("/api/discovery/search")
        .insert_header(("Authorization", bearer_token("ed", "ed@example.com")))
        .insert_header(("X-Device-Id", "device_ed"))
        .set_json(json!({ "itineraryId": "itin_ed" }))
        .to_request();
    test::call_service(&app, req).await;
    let req = test::TestRequest::post()
        .uri("/api/discovery/accept")
        .insert_header(("Authorization", bearer_token("ed", "ed@example.com")))
        .insert_header(("X-Device-Id", "device_ed"))
        .set_json(json!({ "candidateId": "itin_fay" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/discovery/search")
        .insert_header(("Authorization", bearer_token("fay", "fay@example.com")))
        .insert_header(("X-Device-Id", "device_fay"))
        .set_json(json!({ "itineraryId": "itin_fay" }))
        .to_request();
    test::call_service(&app, req).await;

    test_app.store.fail_connection_writes(true);

    let req = test::TestRequest::post()
        .uri("/api/discovery/accept")
        .insert_header(("Authorization", bearer_token("fay", "fay@example.com")))
        .insert_header(("X-Device-Id", "device_fay"))
        .set_json(json!({ "candidateId": "itin_ed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["outcome"], "match_failed");
    assert_eq!(body["data"]["partnerUid"], "ed");
    assert_eq!(body["data"]["message"], MATCH_SETUP_ISSUE);
    assert_eq!(test_app.store.connection_count(), 0);

    // The like is durable, so a retry completes the match.
    let ed_itin = test_app.store.get_itinerary("itin_ed").await.unwrap().unwrap();
    assert!(ed_itin.has_liked("fay"));

    test_app.store.fail_connection_writes(false);
    let req = test::TestRequest::post()
        .uri("/api/discovery/accept")
        .insert_header(("Authorization", bearer_token("fay", "fay@example.com")))
        .insert_header(("X-Device-Id", "device_fay"))
        .set_json(json!({ "candidateId": "itin_ed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["outcome"], "matched");
    assert_eq!(body["data"]["connection"]["_id"], "ed_fay");
    assert_eq!(test_app.store.connection_count(), 1);
}

#[actix_rt::test]
#[serial]
async fn swiping_without_a_session_is_rejected() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    for uri in ["/api/discovery/accept", "/api/discovery/reject"] {
        let req = test::TestRequest::post()
            .uri(uri)
            .insert_header(("Authorization", bearer_token("zoe", "zoe@example.com")))
            .set_json(json!({ "candidateId": "anything" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No active discovery session");
    }
}

#[actix_rt::test]
#[serial]
async fn search_checks_itinerary_existence_and_ownership() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    seed_traveler(&test_app, "other", &itinerary("itin_other", "other", "Rome", 1, 5)).await;

    let req = test::TestRequest::post()
        .uri("/api/discovery/search")
        .insert_header(("Authorization", bearer_token("mia", "mia@example.com")))
        .set_json(json!({ "itineraryId": "itin_other" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    let req = test::TestRequest::post()
        .uri("/api/discovery/search")
        .insert_header(("Authorization", bearer_token("mia", "mia@example.com")))
        .set_json(json!({ "itineraryId": "missing" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
#[serial]
async fn quota_endpoint_reports_fresh_defaults() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/discovery/quota")
        .insert_header(("Authorization", bearer_token("newcomer", "new@example.com")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["limit"], 10);
    assert_eq!(body["data"]["remaining"], 10);
    assert_eq!(body["data"]["limitReached"], false);
    assert_eq!(body["data"]["premium"], false);
}
