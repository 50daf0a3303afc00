use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::ListingStock;

/// Read and write access to listing stock levels, as owned by the listings subsystem.
#[allow(async_fn_in_trait)]
pub trait ListingManagement {
    async fn fetch_listing_stock(&self, listing_id: &str) -> Result<Option<ListingStock>, ListingStoreError>;

    /// Atomically takes `quantity` units off a listing and returns the updated record.
    ///
    /// Stock never goes below zero. A listing that runs out is marked sold, with `sold_at` set on the first sell-out.
    /// Returns [`ListingStoreError::ListingNotFound`] if the listing is gone.
    async fn decrement_listing_stock(
        &self,
        listing_id: &str,
        quantity: i64,
        sold_at: DateTime<Utc>,
    ) -> Result<ListingStock, ListingStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum ListingStoreError {
    #[error("Listing store error: {0}")]
    DatabaseError(String),
    #[error("Listing {0} does not exist")]
    ListingNotFound(String),
}

impl From<sqlx::Error> for ListingStoreError {
    fn from(e: sqlx::Error) -> Self {
        ListingStoreError::DatabaseError(e.to_string())
    }
}
