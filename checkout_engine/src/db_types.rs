//! Data types shared by the checkout engine and its storage backends.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use msq_common::MinorUnits;
use serde::{Deserialize, Serialize};
pub use sqlx::types::Json;
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::order_ref_for;

//--------------------------------------       SessionId       ---------------------------------------------------------
/// The payment provider's identifier for a checkout session, e.g. `cs_123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh, random order id.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The human-readable reference for this order. See [`order_ref_for`].
    pub fn order_ref(&self) -> String {
        order_ref_for(self)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------     Cart payload      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub listing_id: String,
    pub title: String,
    pub price: MinorUnits,
    pub quantity: i64,
    pub seller_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub postcode: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub items_subtotal: MinorUnits,
    pub service_fee: MinorUnits,
    pub shipping_cost: MinorUnits,
    pub total: MinorUnits,
    pub currency: String,
}

/// The immutable cart snapshot taken when checkout began.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartPayload {
    pub items: Vec<CartItem>,
    pub shipping_method: String,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub offer_id: Option<String>,
    pub totals: OrderTotals,
}

//--------------------------------------    CheckoutSession    ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct CheckoutSession {
    pub session_id: SessionId,
    pub user_id: String,
    pub payload: Json<CartPayload>,
    /// Set when a finalize attempt takes the lock. Doubles as the "attempt started" marker.
    pub consumed_at: Option<DateTime<Utc>>,
    /// Set exactly once, when the order for this session has been created.
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How far along the finalize protocol a session is, as observed from a single read of the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No finalize attempt has taken the lock yet.
    Open,
    /// Locked without a result. Either an attempt is in flight, or it crashed.
    InFlight { locked_at: DateTime<Utc> },
    /// The order exists. Terminal.
    Finalized { order_id: OrderId },
}

impl CheckoutSession {
    pub fn state(&self) -> SessionState {
        match (&self.consumed_at, &self.order_id) {
            (Some(_), Some(order_id)) => SessionState::Finalized { order_id: order_id.clone() },
            (Some(locked_at), None) => SessionState::InFlight { locked_at: *locked_at },
            // An order id without a lock can only come from manual intervention. The order id still wins.
            (None, Some(order_id)) => SessionState::Finalized { order_id: order_id.clone() },
            (None, None) => SessionState::Open,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn cart(&self) -> &CartPayload {
        &self.payload.0
    }
}

#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    pub session_id: SessionId,
    pub user_id: String,
    pub payload: CartPayload,
}

impl NewCheckoutSession {
    pub fn new<S: Into<SessionId>>(session_id: S, user_id: &str, payload: CartPayload) -> Self {
        Self { session_id: session_id.into(), user_id: user_id.to_string(), payload }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub listing_id: String,
    pub title: String,
    pub price: MinorUnits,
    pub quantity: i64,
    pub seller_id: String,
}

impl From<CartItem> for OrderItem {
    fn from(item: CartItem) -> Self {
        Self {
            listing_id: item.listing_id,
            title: item.title,
            price: item.price,
            quantity: item.quantity,
            seller_id: item.seller_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub order_ref: String,
    pub checkout_session_id: SessionId,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_method: String,
    pub shipping_address: Option<ShippingAddress>,
    pub totals: OrderTotals,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub checkout_session_id: SessionId,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_method: String,
    pub shipping_address: Option<ShippingAddress>,
    pub totals: OrderTotals,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Builds the order for a checkout session from its cart snapshot, with a freshly generated order id.
    pub fn from_cart(session_id: &SessionId, user_id: &str, cart: &CartPayload) -> Self {
        Self {
            order_id: OrderId::random(),
            checkout_session_id: session_id.clone(),
            user_id: user_id.to_string(),
            items: cart.items.iter().cloned().map(OrderItem::from).collect(),
            shipping_method: cart.shipping_method.clone(),
            shipping_address: cart.shipping_address.clone(),
            totals: cart.totals.clone(),
            created_at: Utc::now(),
        }
    }
}

//--------------------------------------     ListingStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Visible and purchasable.
    Active,
    /// Held for a buyer while a checkout is in progress.
    Reserved,
    /// No stock remains.
    Sold,
    /// Not yet published by the seller.
    Draft,
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct StatusConversionError(pub String);

impl Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::Active => write!(f, "active"),
            ListingStatus::Reserved => write!(f, "reserved"),
            ListingStatus::Sold => write!(f, "sold"),
            ListingStatus::Draft => write!(f, "draft"),
        }
    }
}

impl FromStr for ListingStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "reserved" => Ok(Self::Reserved),
            "sold" => Ok(Self::Sold),
            "draft" => Ok(Self::Draft),
            _ => Err(StatusConversionError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ListingStock {
    pub listing_id: String,
    pub quantity: i64,
    pub status: ListingStatus,
    pub sold_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// A listing as published by the listings subsystem. Used for seeding and tests.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub listing_id: String,
    pub title: String,
    pub seller_id: String,
    pub price: MinorUnits,
    pub quantity: i64,
    pub status: ListingStatus,
}

impl NewListing {
    pub fn new(listing_id: &str, price: MinorUnits, quantity: i64) -> Self {
        Self {
            listing_id: listing_id.to_string(),
            title: format!("Listing {listing_id}"),
            seller_id: "seller".to_string(),
            price,
            quantity,
            status: ListingStatus::Active,
        }
    }

    pub fn with_status(mut self, status: ListingStatus) -> Self {
        self.status = status;
        self
    }
}

//--------------------------------------      OfferStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Completed,
}

impl Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferStatus::Pending => write!(f, "pending"),
            OfferStatus::Accepted => write!(f, "accepted"),
            OfferStatus::Rejected => write!(f, "rejected"),
            OfferStatus::Expired => write!(f, "expired"),
            OfferStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for OfferStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            "completed" => Ok(Self::Completed),
            _ => Err(StatusConversionError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Offer {
    pub offer_id: String,
    pub listing_id: String,
    pub buyer_id: String,
    pub amount: MinorUnits,
    pub status: OfferStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOffer {
    pub offer_id: String,
    pub listing_id: String,
    pub buyer_id: String,
    pub amount: MinorUnits,
    pub status: OfferStatus,
}

impl NewOffer {
    pub fn new(offer_id: &str, listing_id: &str, buyer_id: &str, amount: MinorUnits, status: OfferStatus) -> Self {
        Self {
            offer_id: offer_id.to_string(),
            listing_id: listing_id.to_string(),
            buyer_id: buyer_id.to_string(),
            amount,
            status,
        }
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
/// What the payment provider currently reports for a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub paid: bool,
}

impl PaymentStatus {
    pub fn paid() -> Self {
        Self { paid: true }
    }

    pub fn unpaid() -> Self {
        Self { paid: false }
    }
}
