//! Tests for the Sellbrite client

use chrono::NaiveDate;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::models::{ListingPayload, ProductMetadata, Sku, Upc};
use crate::sellbrite::{AuthScheme, PublishOutcome, SellbriteApi, SELLBRITE_API_URL};

fn api_with_mock(mock_uri: &str) -> SellbriteApi {
    SellbriteApi::new(reqwest::Client::new(), "key".to_string(), "secret".to_string())
        .with_base_url(mock_uri)
}

fn create_test_payload() -> ListingPayload {
    ListingPayload::new(
        Sku::new(NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(), 1),
        ProductMetadata {
            title: "Acme Kettle".to_string(),
            description: "1.7L stainless kettle".to_string(),
            brand: "Acme".to_string(),
            manufacturer: "Acme Corp".to_string(),
            model_number: "AK-17".to_string(),
            msrp: "39.98".to_string(),
            category: "Kitchen".to_string(),
        },
        7.5,
        Upc::parse("012345678905").unwrap(),
    )
}

#[test]
fn creates_api_with_defaults() {
    let api = SellbriteApi::new(reqwest::Client::new(), "k".to_string(), "s".to_string());
    assert_eq!(api.base_url, SELLBRITE_API_URL);
    assert_eq!(api.auth_scheme, AuthScheme::Basic);
}

#[test]
fn basic_auth_is_base64_encoded() {
    let api = SellbriteApi::new(reqwest::Client::new(), "key".to_string(), "secret".to_string());
    // base64("key:secret")
    assert_eq!(api.authorization(), "Basic a2V5OnNlY3JldA==");
}

#[test]
fn legacy_auth_is_concatenated() {
    let api = SellbriteApi::new(reqwest::Client::new(), "key".to_string(), "secret".to_string())
        .with_auth_scheme(AuthScheme::LegacyConcatenated);
    assert_eq!(api.authorization(), "Basic key:secret");
}

#[tokio::test]
async fn created_status_is_success() {
    let mock_server = MockServer::start().await;
    let api = api_with_mock(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/products"))
        .and(header("Content-Type", "application/json"))
        .and(header("Authorization", "Basic a2V5OnNlY3JldA=="))
        .and(body_json(serde_json::json!({
            "sku": "260106-B-001",
            "title": "Acme Kettle",
            "description": "1.7L stainless kettle",
            "brand": "Acme",
            "manufacturer": "Acme Corp",
            "model_number": "AK-17",
            "price": 7.5,
            "category": "Kitchen",
            "upc": "012345678905"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = api.create_product(&create_test_payload()).await.unwrap();
    assert_eq!(outcome, PublishOutcome::Created);
    assert!(outcome.is_created());
}

#[tokio::test]
async fn ok_status_is_not_created() {
    let mock_server = MockServer::start().await;
    let api = api_with_mock(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&mock_server)
        .await;

    let outcome = api.create_product(&create_test_payload()).await.unwrap();
    assert!(!outcome.is_created());
}

#[tokio::test]
async fn rejection_carries_body_and_is_not_retried() {
    let mock_server = MockServer::start().await;
    let api = api_with_mock(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string(r#"{"error":"sku already exists"}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    match api.create_product(&create_test_payload()).await.unwrap() {
        PublishOutcome::Rejected { status, body } => {
            assert_eq!(status.as_u16(), 422);
            assert_eq!(body, r#"{"error":"sku already exists"}"#);
        }
        other => panic!("Expected Rejected, got: {other:?}"),
    }
}
