use std::time::Duration;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use checkout_engine::{checkout_objects::FinalizeOptions, CheckoutFlowApi};
use chrono::Utc;
use msq_common::Secret;

use super::{
    helpers::{finalized_session, post_request, session, SESSION_ID},
    mocks::{paid_gateway, unpaid_gateway, MockCheckoutDb, MockGateway},
};
use crate::{helpers::calculate_hmac, middleware::HmacMiddlewareFactory, routes::CheckoutCompletedRoute};

const PATH: &str = "/webhook/checkout_completed";
const SECRET: &str = "whsec_test_0123456789";
const SIG_HEADER: &str = "X-Msq-Signature";

fn configure(db: MockCheckoutDb, gateway: MockGateway, hmac_checks: bool) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let options = FinalizeOptions::default().with_processing_retry_after(Duration::from_millis(1500));
        let api = CheckoutFlowApi::new(db, gateway).with_options(options);
        let hmac = HmacMiddlewareFactory::new(SIG_HEADER, Secret::new(SECRET.to_string()), hmac_checks);
        cfg.service(
            web::scope("/webhook")
                .wrap(hmac)
                .service(CheckoutCompletedRoute::<MockCheckoutDb, MockGateway>::new()),
        )
        .app_data(web::Data::new(api));
    }
}

fn db_with_session(session: Option<checkout_engine::db_types::CheckoutSession>) -> MockCheckoutDb {
    let mut db = MockCheckoutDb::new();
    db.expect_fetch_checkout_session().returning(move |_| Ok(session.clone()));
    db
}

fn notification() -> String {
    format!(r#"{{"session_id":"{SESSION_ID}"}}"#)
}

#[actix_web::test]
async fn unsigned_webhook_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut db = MockCheckoutDb::new();
    db.expect_fetch_checkout_session().never();
    let err = post_request(PATH, &[], &notification(), configure(db, MockGateway::new(), true))
        .await
        .expect_err("Expected error");
    assert_eq!(err, "No webhook signature found.");
}

#[actix_web::test]
async fn tampered_webhook_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut db = MockCheckoutDb::new();
    db.expect_fetch_checkout_session().never();
    let signature = calculate_hmac(SECRET, br#"{"session_id":"cs_other"}"#);
    let err = post_request(PATH, &[(SIG_HEADER, signature.as_str())], &notification(), configure(db, MockGateway::new(), true))
        .await
        .expect_err("Expected error");
    assert_eq!(err, "Invalid webhook signature.");
}

#[actix_web::test]
async fn signature_checks_can_be_disabled() {
    let _ = env_logger::try_init().ok();
    let db = db_with_session(Some(finalized_session("3f2a9c1b-7d4e-4a10-9b1f-5e6d7c8b9a00")));
    let res = post_request(PATH, &[], &notification(), configure(db, paid_gateway(), false))
        .await
        .expect("Request failed");
    assert_eq!(res.status, StatusCode::OK);
}

#[actix_web::test]
async fn signed_webhook_for_finalized_session() {
    let _ = env_logger::try_init().ok();
    let mut db = db_with_session(Some(finalized_session("3f2a9c1b-7d4e-4a10-9b1f-5e6d7c8b9a00")));
    db.expect_insert_order_for_session().never();
    let body = notification();
    let signature = calculate_hmac(SECRET, body.as_bytes());
    let res = post_request(PATH, &[(SIG_HEADER, signature.as_str())], &body, configure(db, paid_gateway(), true))
        .await
        .expect("Request failed");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, r#"{"success":true,"message":"Order MS-3F2A9C1B already exists."}"#);
}

#[actix_web::test]
async fn unknown_session_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = notification();
    let signature = calculate_hmac(SECRET, body.as_bytes());
    let res = post_request(PATH, &[(SIG_HEADER, signature.as_str())], &body, configure(db_with_session(None), paid_gateway(), true))
        .await
        .expect("Request failed");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, r#"{"success":false,"message":"Checkout session not found."}"#);
}

#[actix_web::test]
async fn unpaid_session_asks_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let mut db = db_with_session(Some(session(None, None)));
    db.expect_try_lock_session().never();
    let body = notification();
    let signature = calculate_hmac(SECRET, body.as_bytes());
    let res = post_request(PATH, &[(SIG_HEADER, signature.as_str())], &body, configure(db, unpaid_gateway(), true))
        .await
        .expect("Request failed");
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn in_flight_session_asks_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let mut db = db_with_session(Some(session(Some(Utc::now()), None)));
    db.expect_try_lock_session().never();
    let body = notification();
    let signature = calculate_hmac(SECRET, body.as_bytes());
    let res = post_request(PATH, &[(SIG_HEADER, signature.as_str())], &body, configure(db, paid_gateway(), true))
        .await
        .expect("Request failed");
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.retry_after.as_deref(), Some("2"));
}

#[actix_web::test]
async fn malformed_notification() {
    let _ = env_logger::try_init().ok();
    let mut db = MockCheckoutDb::new();
    db.expect_fetch_checkout_session().never();
    let body = r#"{"id":"cs_test_a1b2c3"}"#;
    let signature = calculate_hmac(SECRET, body.as_bytes());
    let res = post_request(PATH, &[(SIG_HEADER, signature.as_str())], body, configure(db, MockGateway::new(), true))
        .await
        .expect("Request failed");
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}
