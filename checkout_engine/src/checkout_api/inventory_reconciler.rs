use chrono::Utc;
use log::*;

use crate::{
    db_types::{ListingStatus, OrderItem},
    traits::{ListingManagement, ListingStoreError},
};

/// What happened to each listing touched by an order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Listings whose stock was decremented and still have units left.
    pub updated: Vec<String>,
    /// Listings that reached zero and were marked sold.
    pub sold_out: Vec<String>,
    /// Listings that no longer exist.
    pub skipped: Vec<String>,
    /// Listings whose stock update failed.
    pub failed: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Clamps an ordered quantity to `1..=max`.
pub fn clamp_quantity(quantity: i64, max: i64) -> i64 {
    quantity.clamp(1, max.max(1))
}

/// Decrements listing stock after an order has been placed.
///
/// The reconciler is best-effort. A failure on one listing is logged and recorded in the report; it never stops the
/// remaining listings from being processed, and it never undoes the order.
pub struct InventoryReconciler<'a, B> {
    db: &'a B,
    max_line_quantity: i64,
}

impl<'a, B> InventoryReconciler<'a, B>
where B: ListingManagement
{
    pub fn new(db: &'a B, max_line_quantity: i64) -> Self {
        Self { db, max_line_quantity }
    }

    pub async fn reconcile(&self, items: &[OrderItem]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let now = Utc::now();
        for item in items {
            let ordered = clamp_quantity(item.quantity, self.max_line_quantity);
            match self.db.decrement_listing_stock(&item.listing_id, ordered, now).await {
                Ok(stock) if stock.status == ListingStatus::Sold => {
                    debug!("📦️ Listing {} sold out after taking {ordered}", item.listing_id);
                    report.sold_out.push(item.listing_id.clone());
                },
                Ok(stock) => {
                    debug!("📦️ Listing {} has {} left ({})", item.listing_id, stock.quantity, stock.status);
                    report.updated.push(item.listing_id.clone());
                },
                Err(ListingStoreError::ListingNotFound(_)) => {
                    warn!("📦️ Listing {} no longer exists. Skipping its stock update.", item.listing_id);
                    report.skipped.push(item.listing_id.clone());
                },
                Err(e) => {
                    error!("📦️ Could not update stock for listing {}. {e}", item.listing_id);
                    report.failed.push(item.listing_id.clone());
                },
            }
        }
        report
    }
}
