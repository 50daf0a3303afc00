#![allow(dead_code)]

pub mod prepare_env;
pub mod stub_gateway;

use checkout_engine::{
    db_types::*,
    sqlite::db::{listings, offers},
    traits::CheckoutSessionStore,
    SqliteDatabase,
};
use msq_common::MinorUnits;

pub fn cart_item(listing_id: &str, price: i64, quantity: i64) -> CartItem {
    CartItem {
        listing_id: listing_id.to_string(),
        title: format!("Item {listing_id}"),
        price: MinorUnits::from(price),
        quantity,
        seller_id: "seller_1".to_string(),
    }
}

pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        name: "Ada Lovelace".into(),
        line1: "12 St James's Square".into(),
        line2: None,
        city: "London".into(),
        postcode: "SW1Y 4JH".into(),
        country: "GB".into(),
    }
}

pub fn cart(items: Vec<CartItem>, offer_id: Option<&str>) -> CartPayload {
    let items_subtotal: MinorUnits = items.iter().map(|i| i.price * i.quantity).sum();
    let service_fee = MinorUnits::from(250);
    let shipping_cost = MinorUnits::from(250);
    CartPayload {
        items,
        shipping_method: "standard".into(),
        shipping_address: Some(shipping_address()),
        offer_id: offer_id.map(String::from),
        totals: OrderTotals {
            items_subtotal,
            service_fee,
            shipping_cost,
            total: items_subtotal + service_fee + shipping_cost,
            currency: "GBP".into(),
        },
    }
}

pub async fn seed_session(db: &SqliteDatabase, session_id: &str, user_id: &str, cart: CartPayload) -> CheckoutSession {
    let session = NewCheckoutSession::new(session_id, user_id, cart);
    db.insert_checkout_session(session).await.expect("Error inserting checkout session")
}

pub async fn seed_listing(db: &SqliteDatabase, listing: NewListing) -> ListingStock {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    listings::insert_listing(listing, &mut conn).await.expect("Error inserting listing")
}

pub async fn seed_offer(db: &SqliteDatabase, offer: NewOffer) -> Offer {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    offers::insert_offer(offer, &mut conn).await.expect("Error inserting offer")
}
