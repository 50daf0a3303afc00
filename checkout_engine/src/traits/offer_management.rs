use thiserror::Error;

use crate::db_types::Offer;

/// Access to negotiated-price offers. The checkout engine only ever closes accepted offers.
#[allow(async_fn_in_trait)]
pub trait OfferManagement {
    async fn fetch_offer(&self, offer_id: &str) -> Result<Option<Offer>, OfferStoreError>;

    /// Moves the offer from `accepted` to `completed` in one conditional write.
    ///
    /// Returns `false` if the offer does not exist or is in any other state; nothing is changed in that case.
    async fn complete_accepted_offer(&self, offer_id: &str) -> Result<bool, OfferStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum OfferStoreError {
    #[error("Offer store error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OfferStoreError {
    fn from(e: sqlx::Error) -> Self {
        OfferStoreError::DatabaseError(e.to_string())
    }
}
