use reqwest::StatusCode;

use serde_json::json;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use flightdeals::model::DealFilter;
use flightdeals::repo::DealRepo;

use crate::helpers::{completion_with, TestApp, TestOptions, SOURCE_PATH};

async fn mount_source(app: &TestApp, html: &str) {
    Mock::given(path(SOURCE_PATH))
        .and(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(&app.source_server)
        .await;
}

#[tokio::test]
async fn ingest_without_extraction_key_fails() {
    let app = TestApp::spawn_with(TestOptions {
        extraction_key: false,
        ..Default::default()
    })
    .await;

    let res = app.ingest().await.expect("Failed to execute request");

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("ingest.extraction.api_key"));
}

#[tokio::test]
async fn ingest_stores_valid_candidates() {
    let app = TestApp::spawn().await;
    mount_source(&app, "<html><body>London to New York £199 return</body></html>").await;

    Mock::given(path("/v1/chat/completions"))
        .and(method("POST"))
        .and(body_string_contains("London to New York"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_with(json!([
            {
                "origin_airport": "lhr",
                "destination_airport": "JFK",
                "price_gbp": 199,
                "airline": "Test Air",
                "trip_type": "return",
                "outbound_dates": "Nov 10–20",
                "link": "https://example.com/deals/lhr-jfk"
            },
            {
                "origin_airport": "MAN",
                "destination_airport": "BKK",
                "price_gbp": "449.4",
                "link": "https://example.com/deals/man-bkk"
            },
            {
                "origin_airport": "London",
                "destination_airport": "JFK",
                "price_gbp": 99,
                "link": "https://example.com/deals/bad"
            }
        ]))))
        .expect(1)
        .mount(&app.extraction_server)
        .await;

    let res = app.ingest().await.expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json!({ "ok": true, "inserted": 2 }), body);

    let deals = app
        .repo
        .fetch_published(&DealFilter::default(), 50)
        .await
        .unwrap();
    assert_eq!(2, deals.len());

    let man = deals
        .iter()
        .find(|deal| deal.origin_airport.as_ref() == "MAN")
        .unwrap();
    assert_eq!(449, man.price_gbp.value());
    assert_eq!("return", man.trip_type.as_ref());
}

#[tokio::test]
async fn ingest_twice_updates_deals_in_place() {
    let app = TestApp::spawn().await;
    mount_source(&app, "<p>deals</p>").await;

    Mock::given(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_with(json!([{
            "origin_airport": "LHR",
            "destination_airport": "JFK",
            "price_gbp": 199,
            "link": "https://example.com/deals/lhr-jfk"
        }]))))
        .mount(&app.extraction_server)
        .await;

    for _ in 0..2 {
        let res = app.ingest().await.expect("Failed to execute request");
        assert_eq!(StatusCode::OK, res.status());
    }

    let deals = app
        .repo
        .fetch_published(&DealFilter::default(), 50)
        .await
        .unwrap();
    assert_eq!(1, deals.len());
}

#[tokio::test]
async fn ingest_fails_when_extraction_fails() {
    let app = TestApp::spawn().await;
    mount_source(&app, "<p>deals</p>").await;

    Mock::given(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.extraction_server)
        .await;

    let res = app.ingest().await.expect("Failed to execute request");

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Deal extraction failed"));
}

#[tokio::test]
async fn unreachable_sources_are_still_sent_for_extraction() {
    let app = TestApp::spawn().await;

    Mock::given(path(SOURCE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&app.source_server)
        .await;
    Mock::given(path("/v1/chat/completions"))
        .and(body_string_contains("SOURCE_URL:"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_with(json!([]))))
        .expect(1)
        .mount(&app.extraction_server)
        .await;

    let res = app.ingest().await.expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(0, body["inserted"]);
}
