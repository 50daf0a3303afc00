use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    checkout_api::{
        checkout_objects::{CheckoutSummary, FinalizeOptions, FinalizeOutcome, FinalizeRequest},
        inventory_reconciler::InventoryReconciler,
        offer_closer::OfferCloser,
        order_factory::OrderFactory,
    },
    db_types::{CheckoutSession, PaymentStatus, SessionId, SessionState},
    traits::{CheckoutDatabase, PaymentGateway, PaymentGatewayError, SessionLock},
};

/// `CheckoutFlowApi` turns a paid checkout session into exactly one order.
///
/// `finalize` may be called any number of times, from any number of processes, for the same session. The browser
/// redirect and the provider webhook routinely race each other. The only mutual exclusion is the conditional update
/// behind [`crate::traits::CheckoutSessionStore::try_lock_session`]; nothing is held in memory.
pub struct CheckoutFlowApi<B, G> {
    db: B,
    gateway: G,
    options: FinalizeOptions,
}

impl<B, G> Debug for CheckoutFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutFlowApi ({:?})", self.options)
    }
}

impl<B, G> CheckoutFlowApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway, options: FinalizeOptions::default() }
    }

    pub fn with_options(mut self, options: FinalizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FinalizeOptions {
        &self.options
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G> CheckoutFlowApi<B, G>
where
    B: CheckoutDatabase,
    G: PaymentGateway,
{
    /// Finalizes a checkout session.
    ///
    /// The steps, in order:
    /// 1. Load the session. Unknown ids are `NotFound`.
    /// 2. If the request names a caller, they must own the session, or the result is `Forbidden`.
    /// 3. Ask the payment provider. Unpaid sessions are `NotPaid`; a provider failure is an `Error`. Nothing is
    ///    written in either case.
    /// 4. A session that already has an order is `Reused`, with no side effects.
    /// 5. A session that is locked without an order is `Processing`, unless stale lock takeover is enabled and the
    ///    lock has expired.
    /// 6. Take the lock. Losing the race re-reads the session and reports `Reused` or `Processing`.
    /// 7. Under the lock, create the order and record it on the session in one transaction, then reconcile stock and
    ///    close any offer. Stock and offer updates are best-effort and never fail the call.
    ///
    /// If the order cannot be stored, nothing is written and the lock is released so that a retry can succeed.
    pub async fn finalize(&self, request: FinalizeRequest) -> FinalizeOutcome {
        let FinalizeRequest { session_id, caller_user_id, include_shipping_address } = request;
        let session = match self.db.fetch_checkout_session(&session_id).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                debug!("🔄️🧾️ Finalize requested for unknown checkout session {session_id}");
                return FinalizeOutcome::NotFound;
            },
            Err(e) => {
                error!("🔄️🧾️ Could not load checkout session {session_id}. {e}");
                return FinalizeOutcome::error("Could not load the checkout session");
            },
        };

        if let Some(caller) = caller_user_id.as_deref() {
            if !session.is_owned_by(caller) {
                warn!("🔄️🧾️ User {caller} tried to finalize checkout session {session_id}, which they do not own");
                return FinalizeOutcome::Forbidden;
            }
        }

        match self.query_payment_status(&session_id).await {
            Ok(status) if status.paid => {
                trace!("🔄️🧾️ Checkout session {session_id} is paid");
            },
            Ok(_) => {
                debug!("🔄️🧾️ Checkout session {session_id} has not been paid yet");
                return FinalizeOutcome::NotPaid;
            },
            Err(e) => {
                error!("🔄️🧾️ Payment status for checkout session {session_id} is unknown. {e}");
                return FinalizeOutcome::error("Could not confirm payment with the payment provider");
            },
        }

        let now = Utc::now();
        let stale_before = self.stale_before(now);
        if let Some(outcome) = self.classify(&session, stale_before, include_shipping_address) {
            return outcome;
        }

        let lock = match stale_before {
            Some(t) => SessionLock::new(now).reclaiming_before(t),
            None => SessionLock::new(now),
        };
        match self.db.try_lock_session(&session_id, &lock).await {
            Ok(result) if result.is_acquired() => {},
            Ok(_) => {
                debug!("🔄️🧾️ Lost the lock race for checkout session {session_id}");
                return self.reclassify_after_lost_race(&session_id, include_shipping_address).await;
            },
            Err(e) => {
                error!("🔄️🧾️ Could not lock checkout session {session_id}. {e}");
                return FinalizeOutcome::error("Could not lock the checkout session");
            },
        }

        self.finalize_under_lock(session, lock.locked_at, include_shipping_address).await
    }

    async fn query_payment_status(&self, session_id: &SessionId) -> Result<PaymentStatus, PaymentGatewayError> {
        let timeout = self.options.gateway_timeout;
        match tokio::time::timeout(timeout, self.gateway.fetch_payment_status(session_id)).await {
            Ok(result) => result,
            Err(_) => Err(PaymentGatewayError::Timeout(timeout)),
        }
    }

    /// The instant before which a held lock counts as abandoned, if takeover is enabled.
    fn stale_before(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let timeout = self.options.stale_lock_timeout?;
        let timeout = chrono::Duration::from_std(timeout).ok()?;
        now.checked_sub_signed(timeout)
    }

    /// Classifies a session that has already been touched by a finalize attempt. Returns `None` if this call should go
    /// on to take the lock.
    fn classify(
        &self,
        session: &CheckoutSession,
        stale_before: Option<DateTime<Utc>>,
        include_shipping_address: bool,
    ) -> Option<FinalizeOutcome> {
        match session.state() {
            SessionState::Open => None,
            SessionState::Finalized { order_id } => {
                debug!("🔄️🧾️ Checkout session {} already produced order {order_id}", session.session_id);
                let summary = CheckoutSummary::from_cart(order_id, session.cart(), include_shipping_address);
                Some(FinalizeOutcome::Reused(summary))
            },
            SessionState::InFlight { locked_at } => match stale_before {
                Some(t) if locked_at < t => {
                    warn!(
                        "🔄️🧾️ Checkout session {} has been locked since {locked_at} without an order. Taking it over.",
                        session.session_id
                    );
                    None
                },
                _ => {
                    debug!("🔄️🧾️ Checkout session {} is being finalized by another caller", session.session_id);
                    Some(FinalizeOutcome::Processing { retry_after: self.options.processing_retry_after })
                },
            },
        }
    }

    async fn reclassify_after_lost_race(&self, session_id: &SessionId, include_shipping_address: bool) -> FinalizeOutcome {
        match self.db.fetch_checkout_session(session_id).await {
            Ok(Some(session)) => self
                .classify(&session, None, include_shipping_address)
                // The winner released its lock between our attempt and this read. Let the caller try again.
                .unwrap_or(FinalizeOutcome::Processing { retry_after: self.options.processing_retry_after }),
            Ok(None) => FinalizeOutcome::NotFound,
            Err(e) => {
                error!("🔄️🧾️ Could not re-read checkout session {session_id}. {e}");
                FinalizeOutcome::error("Could not load the checkout session")
            },
        }
    }

    async fn finalize_under_lock(
        &self,
        session: CheckoutSession,
        locked_at: DateTime<Utc>,
        include_shipping_address: bool,
    ) -> FinalizeOutcome {
        let session_id = &session.session_id;
        let cart = session.cart();
        let factory = OrderFactory::new(&self.db);
        let order = match factory.create_order(session_id, &session.user_id, cart, locked_at).await {
            Ok(order) => order,
            Err(e) => {
                error!("🔄️🧾️ Order creation failed for checkout session {session_id}. {e}");
                // Only frees a lock that still has no order, so this is a no-op if the commit did land
                self.release_lock(session_id, locked_at).await;
                return FinalizeOutcome::error("Could not create the order");
            },
        };

        let reconciler = InventoryReconciler::new(&self.db, self.options.max_line_quantity);
        let report = reconciler.reconcile(&order.items).await;
        if report.is_clean() {
            debug!("🔄️📦️ Stock reconciled for order {}: {report:?}", order.order_id);
        } else {
            warn!("🔄️📦️ Stock for order {} is out of step with the listings: {report:?}", order.order_id);
        }
        let offer_result = OfferCloser::new(&self.db).close(cart.offer_id.as_deref()).await;
        trace!("🔄️🤝️ Offer close for order {}: {offer_result:?}", order.order_id);

        info!("🔄️🧾️ Checkout session {session_id} finalized as order {} [{}]", order.order_id, order.order_ref);
        FinalizeOutcome::Created(CheckoutSummary::from_cart(order.order_id, cart, include_shipping_address))
    }

    async fn release_lock(&self, session_id: &SessionId, locked_at: DateTime<Utc>) {
        match self.db.release_session_lock(session_id, locked_at).await {
            Ok(true) => debug!("🔄️🧾️ Lock on checkout session {session_id} released"),
            Ok(false) => warn!("🔄️🧾️ Lock on checkout session {session_id} had already moved on"),
            Err(e) => error!("🔄️🧾️ Could not release the lock on checkout session {session_id}. {e}"),
        }
    }
}
