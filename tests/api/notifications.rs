use chrono::{Duration, Utc};

use reqwest::{Method, StatusCode};

use serde_json::json;

use uuid::Uuid;

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use flightdeals::repo::DealRepo;

use crate::helpers::{TestApp, TestOptions};

const SECRET: &str = "operator-secret";

async fn mount_mail_api(app: &TestApp) {
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;
}

#[tokio::test]
async fn notify_requires_a_target() {
    let app = TestApp::spawn().await;

    for body in [json!({}), json!({ "dealId": "  " }), json!("garbage")] {
        let res = app.notify("", body).await.expect("Failed to execute request");

        assert_eq!(StatusCode::BAD_REQUEST, res.status());
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!("Provide dealId or set welcome: true", body["error"]);
    }
}

#[tokio::test]
async fn notify_checks_the_operator_secret() {
    let app = TestApp::spawn_with(TestOptions {
        secret: Some(SECRET),
        ..Default::default()
    })
    .await;
    mount_mail_api(&app).await;
    let deal_id = app.add_deal("LHR", 199, None).await;
    let body = json!({ "dealId": deal_id });

    let res = app
        .request(Method::POST, "api/notify")
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = app
        .request(Method::POST, "api/notify")
        .bearer_auth("wrong")
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = app.notify("", body).await.expect("Failed to execute request");
    assert_eq!(StatusCode::OK, res.status());
}

#[tokio::test]
async fn notify_validates_the_body_before_the_secret() {
    let app = TestApp::spawn_with(TestOptions {
        secret: Some(SECRET),
        ..Default::default()
    })
    .await;

    let res = app
        .request(Method::POST, "api/notify")
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}

#[tokio::test]
async fn dry_run_reports_without_sending() {
    let app = TestApp::spawn().await;
    mount_mail_api(&app).await;
    let deal_id = app.add_deal("LHR", 199, None).await;
    app.add_subscriber("a@example.com").await;
    app.add_subscriber("b@example.com").await;

    let via_query = app
        .notify("?dry=1", json!({ "dealId": deal_id }))
        .await
        .expect("Failed to execute request");
    let via_header = app
        .request(Method::POST, "api/notify")
        .header("x-dry-run", "1")
        .json(&json!({ "dealId": deal_id }))
        .send()
        .await
        .expect("Failed to execute request");

    for res in [via_query, via_header] {
        assert_eq!(StatusCode::OK, res.status());
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(
            json!({
                "ok": true,
                "dryRun": true,
                "from": "UK Flight Deals <alerts@test.com>",
                "subject": "£199 LHR → JFK (return)",
                "wouldSendTo": 2,
            }),
            body
        );
    }

    assert!(app.sent_emails().await.is_empty());
    let deal = app.repo.fetch_by_id(deal_id).await.unwrap().unwrap();
    assert!(deal.last_notified_at.is_none());
}

#[tokio::test]
async fn notify_sends_one_alert_per_subscriber() {
    let app = TestApp::spawn().await;
    mount_mail_api(&app).await;
    let deal_id = app.add_deal("LHR", 199, Some("Nov 10–20")).await;
    app.add_subscriber("a@example.com").await;
    app.add_subscriber("b@example.com").await;

    let res = app
        .notify("", json!({ "dealId": deal_id.to_string() }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json!({ "ok": true, "sent": 2, "failures": [] }), body);

    let emails = app.sent_emails().await;
    assert_eq!(2, emails.len());
    for email in &emails {
        assert_eq!("£199 LHR → JFK (return)", email["Subject"]);
        let text = email["TextBody"].as_str().unwrap();
        assert!(text.contains("Nov 10–20"));
        assert!(text.contains("api/unsubscribe?email="));
    }

    let deal = app.repo.fetch_by_id(deal_id).await.unwrap().unwrap();
    assert!(deal.last_notified_at.is_some());
}

#[tokio::test]
async fn notify_is_rate_limited_within_the_cooldown() {
    let app = TestApp::spawn().await;
    mount_mail_api(&app).await;
    app.add_subscriber("a@example.com").await;

    let recent = app.add_deal("LHR", 199, None).await;
    app.repo
        .mark_notified(recent, Utc::now() - Duration::minutes(5))
        .await
        .unwrap();

    let stale = app.add_deal("MAN", 249, None).await;
    app.repo
        .mark_notified(stale, Utc::now() - Duration::minutes(20))
        .await
        .unwrap();

    let res = app
        .notify("", json!({ "dealId": recent }))
        .await
        .expect("Failed to execute request");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json!({ "ok": true, "sent": 0, "note": "rate limited" }), body);
    assert!(app.sent_emails().await.is_empty());

    let res = app
        .notify("", json!({ "dealId": stale }))
        .await
        .expect("Failed to execute request");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(1, body["sent"]);
}

#[tokio::test]
async fn notify_reports_failed_recipients() {
    let app = TestApp::spawn().await;

    Mock::given(path("/email"))
        .and(body_partial_json(json!({ "To": "fail@example.com" })))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&app.email_server)
        .await;
    mount_mail_api(&app).await;

    let deal_id = app.add_deal("LHR", 199, None).await;
    for email in ["a@example.com", "fail@example.com", "c@example.com"] {
        app.add_subscriber(email).await;
    }

    let res = app
        .notify("", json!({ "dealId": deal_id }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(2, body["sent"]);
    let failures = body["failures"].as_array().unwrap();
    assert_eq!(1, failures.len());
    assert_eq!("fail@example.com", failures[0]["to"]);
    assert!(!failures[0]["error"].as_str().unwrap().is_empty());

    assert_eq!(3, app.sent_emails().await.len());
}

#[tokio::test]
async fn notify_unknown_deals_are_not_found() {
    let app = TestApp::spawn().await;
    app.add_subscriber("a@example.com").await;

    for deal_id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
        let res = app
            .notify("", json!({ "dealId": deal_id }))
            .await
            .expect("Failed to execute request");

        assert_eq!(StatusCode::NOT_FOUND, res.status());
    }
}

#[tokio::test]
async fn notify_with_a_numeric_deal_id_looks_it_up() {
    let app = TestApp::spawn().await;
    app.add_subscriber("a@example.com").await;

    let res = app
        .notify("", json!({ "dealId": 123, "welcome": false }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::NOT_FOUND, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!("Deal not found", body["error"]);
}

#[tokio::test]
async fn notify_without_subscribers_sends_nothing() {
    let app = TestApp::spawn().await;
    mount_mail_api(&app).await;
    let deal_id = app.add_deal("LHR", 199, None).await;

    let res = app
        .notify("", json!({ "dealId": deal_id }))
        .await
        .expect("Failed to execute request");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json!({ "ok": true, "sent": 0, "note": "no subscribers" }), body);
    assert!(app.sent_emails().await.is_empty());
}

#[tokio::test]
async fn welcome_broadcast_reaches_every_subscriber() {
    let app = TestApp::spawn().await;
    mount_mail_api(&app).await;
    app.add_subscriber("a@example.com").await;
    app.add_subscriber("b@example.com").await;

    let res = app
        .notify("?welcome=1", json!({}))
        .await
        .expect("Failed to execute request");

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(2, body["sent"]);

    let emails = app.sent_emails().await;
    assert_eq!(2, emails.len());
    assert!(emails
        .iter()
        .all(|email| email["Subject"] == "Welcome to UK Flight Deals"));
}
