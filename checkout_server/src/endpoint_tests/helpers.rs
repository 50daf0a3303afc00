use actix_web::{
    body::MessageBody,
    http::{header::RETRY_AFTER, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use checkout_engine::db_types::{
    CartItem,
    CartPayload,
    CheckoutSession,
    Json,
    Order,
    OrderId,
    OrderTotals,
    SessionId,
    ShippingAddress,
};
use chrono::{DateTime, Utc};
use log::debug;
use msq_common::MinorUnits;

pub const BUYER: &str = "buyer-17";
pub const SESSION_ID: &str = "cs_test_a1b2c3";

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub retry_after: Option<String>,
    pub body: String,
}

/// Sends a POST request through an app built by `configure`. Errors raised by middleware come back as `Err`.
pub async fn post_request<F>(
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
    configure: F,
) -> Result<TestResponse, String>
where
    F: FnOnce(&mut ServiceConfig),
{
    let mut req = TestRequest::post().uri(path).insert_header(("Content-Type", "application/json"));
    for &(name, value) in headers {
        req = req.insert_header((name, value));
    }
    let req = req.set_payload(body.to_string()).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("🚀️ Making request to {path}");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let retry_after = res.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()).map(String::from);
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok(TestResponse { status, retry_after, body })
}

pub fn cart() -> CartPayload {
    CartPayload {
        items: vec![CartItem {
            listing_id: "lst_lamp".into(),
            title: "Brass desk lamp".into(),
            price: MinorUnits::from(4500),
            quantity: 1,
            seller_id: "seller-3".into(),
        }],
        shipping_method: "tracked-48".into(),
        shipping_address: Some(ShippingAddress {
            name: "Ada Lovelace".into(),
            line1: "12 St James's Square".into(),
            line2: None,
            city: "London".into(),
            postcode: "SW1Y 4JH".into(),
            country: "GB".into(),
        }),
        offer_id: None,
        totals: OrderTotals {
            items_subtotal: MinorUnits::from(4500),
            service_fee: MinorUnits::from(250),
            shipping_cost: MinorUnits::from(250),
            total: MinorUnits::from(5000),
            currency: "GBP".into(),
        },
    }
}

pub fn session(consumed_at: Option<DateTime<Utc>>, order_id: Option<OrderId>) -> CheckoutSession {
    let now = Utc::now();
    CheckoutSession {
        session_id: SessionId::from(SESSION_ID),
        user_id: BUYER.into(),
        payload: Json(cart()),
        consumed_at,
        order_id,
        created_at: now,
        updated_at: now,
    }
}

pub fn finalized_session(order_id: &str) -> CheckoutSession {
    session(Some(Utc::now()), Some(OrderId(order_id.into())))
}

/// What the store hands back for an inserted order.
pub fn stored_order(order: checkout_engine::db_types::NewOrder) -> Order {
    Order {
        order_ref: order.order_id.order_ref(),
        order_id: order.order_id,
        checkout_session_id: order.checkout_session_id,
        user_id: order.user_id,
        items: order.items,
        shipping_method: order.shipping_method,
        shipping_address: order.shipping_address,
        totals: order.totals,
        created_at: order.created_at,
    }
}
