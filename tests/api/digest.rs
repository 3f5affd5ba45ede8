use chrono::{Duration, Utc};

use reqwest::{Method, StatusCode};

use serde_json::json;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{TestApp, TestOptions};

async fn mount_mail_api(app: &TestApp) {
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;
}

#[tokio::test]
async fn disabled_digest_sends_nothing() {
    let app = TestApp::spawn_with(TestOptions {
        digest_disabled: true,
        ..Default::default()
    })
    .await;
    mount_mail_api(&app).await;
    app.add_deal("LHR", 199, None).await;
    app.add_subscriber("a@example.com").await;

    let res = app.digest().await.expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json!({ "ok": true, "sent": 0, "disabled": true }), body);
    assert!(app.sent_emails().await.is_empty());
}

#[tokio::test]
async fn digest_without_recent_deals_sends_nothing() {
    let app = TestApp::spawn().await;
    mount_mail_api(&app).await;
    app.add_subscriber("a@example.com").await;

    let res = app.digest().await.expect("Failed to execute request");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(
        json!({ "ok": true, "sent": 0, "note": "no deals in last 7 days" }),
        body
    );
}

#[tokio::test]
async fn digest_without_subscribers_sends_nothing() {
    let app = TestApp::spawn().await;
    mount_mail_api(&app).await;
    app.add_deal("LHR", 199, None).await;

    let res = app.digest().await.expect("Failed to execute request");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json!({ "ok": true, "sent": 0 }), body);
}

#[tokio::test]
async fn digest_lists_the_cheapest_deals_for_every_subscriber() {
    let app = TestApp::spawn().await;
    mount_mail_api(&app).await;
    app.add_deal("LHR", 349, None).await;
    app.add_deal("MAN", 149, Some("Jan–Feb")).await;
    app.add_subscriber("a@example.com").await;
    app.add_subscriber("b@example.com").await;

    let res = app.digest().await.expect("Failed to execute request");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json!({ "ok": true, "sent": 2, "failures": [] }), body);

    let emails = app.sent_emails().await;
    assert_eq!(2, emails.len());
    for email in &emails {
        assert_eq!("Your weekly UK Flight Deals", email["Subject"]);

        let text = email["TextBody"].as_str().unwrap();
        let cheapest = text.find("£149 MAN → JFK · Jan–Feb").unwrap();
        let dearest = text.find("£349 LHR → JFK").unwrap();
        assert!(cheapest < dearest);
    }
}

#[tokio::test]
async fn digest_requires_the_operator_secret() {
    let app = TestApp::spawn_with(TestOptions {
        secret: Some("operator-secret"),
        ..Default::default()
    })
    .await;

    let res = app
        .request(Method::POST, "api/digest")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = app.digest().await.expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());
}

#[tokio::test]
async fn digest_skips_deals_older_than_a_week() {
    let app = TestApp::spawn().await;
    mount_mail_api(&app).await;
    app.add_subscriber("a@example.com").await;

    let deal_id = app.add_deal("LHR", 199, None).await;
    assert!(
        app.repo
            .set_found_at(deal_id, Utc::now() - Duration::days(8))
            .await
    );

    let res = app.digest().await.expect("Failed to execute request");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!("no deals in last 7 days", body["note"]);
    assert!(app.sent_emails().await.is_empty());
}
