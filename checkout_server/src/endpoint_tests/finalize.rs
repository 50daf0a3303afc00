use std::time::Duration;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use checkout_engine::{
    checkout_objects::FinalizeOptions,
    db_types::{ListingStatus, ListingStock, PaymentStatus},
    traits::{CheckoutStoreError, LockResult, OrderStoreError, PaymentGatewayError},
    CheckoutFlowApi,
};
use chrono::Utc;
use serde_json::Value;

use super::{
    helpers::{finalized_session, post_request, session, stored_order, BUYER, SESSION_ID},
    mocks::{paid_gateway, unpaid_gateway, MockCheckoutDb, MockGateway},
};
use crate::{helpers::CallerIdHeader, routes::FinalizeCheckoutRoute};

const PATH: &str = "/api/checkout/cs_test_a1b2c3/finalize";

fn configure(db: MockCheckoutDb, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let options = FinalizeOptions::default().with_processing_retry_after(Duration::from_millis(1500));
        let api = CheckoutFlowApi::new(db, gateway).with_options(options);
        cfg.service(web::scope("/api").service(FinalizeCheckoutRoute::<MockCheckoutDb, MockGateway>::new()))
            .app_data(web::Data::new(api));
    }
}

fn db_with_session(session: Option<checkout_engine::db_types::CheckoutSession>) -> MockCheckoutDb {
    let mut db = MockCheckoutDb::new();
    db.expect_fetch_checkout_session().returning(move |_| Ok(session.clone()));
    db
}

fn as_buyer() -> [(&'static str, &'static str); 1] {
    [("X-Msq-User-Id", BUYER)]
}

#[actix_web::test]
async fn missing_caller_is_unauthorized() {
    let _ = env_logger::try_init().ok();
    let db = MockCheckoutDb::new();
    let gateway = MockGateway::new();
    let res = post_request(PATH, &[], "", configure(db, gateway)).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body, r#"{"error":"The caller could not be identified."}"#);
}

#[actix_web::test]
async fn caller_header_is_configurable() {
    let _ = env_logger::try_init().ok();
    let db = db_with_session(None);
    let gateway = MockGateway::new();
    let with_custom_header = move |cfg: &mut ServiceConfig| {
        configure(db, gateway)(cfg);
        cfg.app_data(web::Data::new(CallerIdHeader("X-Auth-Subject".into())));
    };
    let res =
        post_request(PATH, &[("X-Auth-Subject", BUYER)], "", with_custom_header).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn unknown_session() {
    let _ = env_logger::try_init().ok();
    let db = db_with_session(None);
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment_status().never();
    let res = post_request(PATH, &as_buyer(), "", configure(db, gateway)).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body, r#"{"success":false,"message":"Checkout session not found."}"#);
}

#[actix_web::test]
async fn someone_elses_session() {
    let _ = env_logger::try_init().ok();
    let db = db_with_session(Some(session(None, None)));
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment_status().never();
    let res = post_request(PATH, &[("X-Msq-User-Id", "buyer-99")], "", configure(db, gateway))
        .await
        .expect("Request failed");
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn unpaid_session() {
    let _ = env_logger::try_init().ok();
    let mut db = db_with_session(Some(session(None, None)));
    db.expect_try_lock_session().never();
    let res = post_request(PATH, &as_buyer(), "", configure(db, unpaid_gateway())).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(res.body, r#"{"success":false,"message":"Payment has not been completed."}"#);
}

#[actix_web::test]
async fn gateway_failure_is_a_server_error() {
    let _ = env_logger::try_init().ok();
    let mut db = db_with_session(Some(session(None, None)));
    db.expect_try_lock_session().never();
    let mut gateway = MockGateway::new();
    gateway
        .expect_fetch_payment_status()
        .returning(|_| Err(PaymentGatewayError::Transport("connection reset".into())));
    let res = post_request(PATH, &as_buyer(), "", configure(db, gateway)).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["success"], false);
    assert!(!body["message"].as_str().unwrap().contains("connection reset"));
}

#[actix_web::test]
async fn in_flight_session_is_processing() {
    let _ = env_logger::try_init().ok();
    let mut db = db_with_session(Some(session(Some(Utc::now()), None)));
    db.expect_try_lock_session().never();
    db.expect_insert_order_for_session().never();
    let res = post_request(PATH, &as_buyer(), "", configure(db, paid_gateway())).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert_eq!(res.retry_after.as_deref(), Some("2"));
    assert_eq!(res.body, r#"{"status":"processing","retry_after_ms":1500}"#);
}

#[actix_web::test]
async fn finalized_session_is_reused() {
    let _ = env_logger::try_init().ok();
    let mut db = db_with_session(Some(finalized_session("3f2a9c1b-7d4e-4a10-9b1f-5e6d7c8b9a00")));
    db.expect_try_lock_session().never();
    db.expect_insert_order_for_session().never();
    db.expect_decrement_listing_stock().never();
    let res = post_request(PATH, &as_buyer(), "", configure(db, paid_gateway())).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::OK);
    let body: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["status"], "reused");
    assert_eq!(body["order"]["order_id"], "3f2a9c1b-7d4e-4a10-9b1f-5e6d7c8b9a00");
    assert_eq!(body["order"]["order_ref"], "MS-3F2A9C1B");
    assert!(body["order"].get("shipping_address").is_none());
}

#[actix_web::test]
async fn shipping_address_on_request() {
    let _ = env_logger::try_init().ok();
    let db = db_with_session(Some(finalized_session("3f2a9c1b-7d4e-4a10-9b1f-5e6d7c8b9a00")));
    let path = format!("{PATH}?include_shipping_address=true");
    let res = post_request(&path, &as_buyer(), "", configure(db, paid_gateway())).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::OK);
    let body: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["order"]["shipping_address"]["postcode"], "SW1Y 4JH");
}

#[actix_web::test]
async fn open_session_creates_an_order() {
    let _ = env_logger::try_init().ok();
    let mut db = db_with_session(Some(session(None, None)));
    db.expect_try_lock_session().times(1).returning(|_, _| Ok(LockResult::Acquired));
    db.expect_insert_order_for_session().times(1).returning(|order, _| Ok(stored_order(order)));
    db.expect_record_order_for_session().never();
    db.expect_release_session_lock().never();
    db.expect_fetch_listing_stock().never();
    db.expect_decrement_listing_stock()
        .withf(|id, quantity, _| id == "lst_lamp" && *quantity == 1)
        .times(1)
        .returning(|id, _, sold_at| {
            Ok(ListingStock {
                listing_id: id.to_string(),
                quantity: 0,
                status: ListingStatus::Sold,
                sold_at: Some(sold_at),
                updated_at: Utc::now(),
            })
        });
    db.expect_complete_accepted_offer().never();
    let mut gateway = MockGateway::new();
    gateway
        .expect_fetch_payment_status()
        .withf(|id| id.as_str() == SESSION_ID)
        .times(1)
        .returning(|_| Ok(PaymentStatus::paid()));
    let res = post_request(PATH, &as_buyer(), "", configure(db, gateway)).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::CREATED);
    let body: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["status"], "created");
    let order_ref = body["order"]["order_ref"].as_str().unwrap();
    assert!(order_ref.starts_with("MS-"));
    assert_eq!(order_ref.len(), 11);
    assert_eq!(body["order"]["items"][0]["listing_id"], "lst_lamp");
    assert_eq!(body["order"]["totals"]["total"], 5000);
}

#[actix_web::test]
async fn failed_order_insert_releases_the_lock() {
    let _ = env_logger::try_init().ok();
    let mut db = db_with_session(Some(session(None, None)));
    db.expect_try_lock_session().times(1).returning(|_, _| Ok(LockResult::Acquired));
    db.expect_insert_order_for_session().times(1).returning(|order, _| {
        Err(OrderStoreError::SessionNotUpdated(CheckoutStoreError::LockLost(order.checkout_session_id)))
    });
    db.expect_release_session_lock().times(1).returning(|_, _| Ok(true));
    db.expect_decrement_listing_stock().never();
    db.expect_complete_accepted_offer().never();
    let res = post_request(PATH, &as_buyer(), "", configure(db, paid_gateway())).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["success"], false);
    assert!(!body["message"].as_str().unwrap().contains("lock"));
}

#[actix_web::test]
async fn lost_lock_race_reports_the_winner() {
    let _ = env_logger::try_init().ok();
    let mut db = MockCheckoutDb::new();
    let mut reads = 0;
    db.expect_fetch_checkout_session().times(2).returning(move |_| {
        reads += 1;
        if reads == 1 {
            Ok(Some(session(None, None)))
        } else {
            Ok(Some(finalized_session("9c1b3f2a-0000-4000-8000-000000000001")))
        }
    });
    db.expect_try_lock_session().times(1).returning(|_, _| Ok(LockResult::NotAcquired));
    db.expect_insert_order_for_session().never();
    let res = post_request(PATH, &as_buyer(), "", configure(db, paid_gateway())).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::OK);
    let body: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["status"], "reused");
    assert_eq!(body["order"]["order_ref"], "MS-9C1B3F2A");
}
