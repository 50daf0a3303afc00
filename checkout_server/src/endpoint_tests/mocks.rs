use checkout_engine::{
    db_types::{
        CheckoutSession,
        ListingStock,
        NewCheckoutSession,
        NewOrder,
        Offer,
        Order,
        OrderId,
        PaymentStatus,
        SessionId,
    },
    traits::{
        CheckoutSessionStore,
        CheckoutStoreError,
        ListingManagement,
        ListingStoreError,
        LockResult,
        OfferManagement,
        OfferStoreError,
        OrderManagement,
        OrderStoreError,
        PaymentGateway,
        PaymentGatewayError,
        SessionLock,
    },
};
use chrono::{DateTime, Utc};
use mockall::mock;

mock! {
    pub CheckoutDb {}
    impl CheckoutSessionStore for CheckoutDb {
        async fn fetch_checkout_session(&self, session_id: &SessionId) -> Result<Option<CheckoutSession>, CheckoutStoreError>;
        async fn insert_checkout_session(&self, session: NewCheckoutSession) -> Result<CheckoutSession, CheckoutStoreError>;
        async fn try_lock_session(&self, session_id: &SessionId, lock: &SessionLock) -> Result<LockResult, CheckoutStoreError>;
        async fn record_order_for_session(&self, session_id: &SessionId, locked_at: DateTime<Utc>, order_id: &OrderId) -> Result<(), CheckoutStoreError>;
        async fn release_session_lock(&self, session_id: &SessionId, locked_at: DateTime<Utc>) -> Result<bool, CheckoutStoreError>;
    }
    impl OrderManagement for CheckoutDb {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;
        async fn insert_order_for_session(&self, order: NewOrder, locked_at: DateTime<Utc>) -> Result<Order, OrderStoreError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;
    }
    impl ListingManagement for CheckoutDb {
        async fn fetch_listing_stock(&self, listing_id: &str) -> Result<Option<ListingStock>, ListingStoreError>;
        async fn decrement_listing_stock(&self, listing_id: &str, quantity: i64, sold_at: DateTime<Utc>) -> Result<ListingStock, ListingStoreError>;
    }
    impl OfferManagement for CheckoutDb {
        async fn fetch_offer(&self, offer_id: &str) -> Result<Option<Offer>, OfferStoreError>;
        async fn complete_accepted_offer(&self, offer_id: &str) -> Result<bool, OfferStoreError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn fetch_payment_status(&self, session_id: &SessionId) -> Result<PaymentStatus, PaymentGatewayError>;
    }
}

pub fn paid_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment_status().returning(|_| Ok(PaymentStatus::paid()));
    gateway
}

pub fn unpaid_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment_status().returning(|_| Ok(PaymentStatus::unpaid()));
    gateway
}
