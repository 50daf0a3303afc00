use log::*;

use crate::{db_types::OfferStatus, traits::OfferManagement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferCloseResult {
    /// The checkout was not tied to an offer.
    NoOffer,
    Completed,
    /// The offer exists but was not in the accepted state, so it was left alone.
    NotAccepted(OfferStatus),
    NotFound,
    Failed(String),
}

/// Closes the negotiated-price offer a checkout was based on, if any. Best-effort: failures are logged and reported,
/// never propagated.
pub struct OfferCloser<'a, B> {
    db: &'a B,
}

impl<'a, B> OfferCloser<'a, B>
where B: OfferManagement
{
    pub fn new(db: &'a B) -> Self {
        Self { db }
    }

    pub async fn close(&self, offer_id: Option<&str>) -> OfferCloseResult {
        let Some(offer_id) = offer_id else {
            return OfferCloseResult::NoOffer;
        };
        match self.db.complete_accepted_offer(offer_id).await {
            Ok(true) => {
                info!("🤝️ Offer {offer_id} completed");
                OfferCloseResult::Completed
            },
            Ok(false) => self.explain_skip(offer_id).await,
            Err(e) => {
                error!("🤝️ Could not complete offer {offer_id}. {e}");
                OfferCloseResult::Failed(e.to_string())
            },
        }
    }

    async fn explain_skip(&self, offer_id: &str) -> OfferCloseResult {
        match self.db.fetch_offer(offer_id).await {
            Ok(Some(offer)) => {
                warn!("🤝️ Offer {offer_id} is {} rather than accepted. Leaving it unchanged.", offer.status);
                OfferCloseResult::NotAccepted(offer.status)
            },
            Ok(None) => {
                warn!("🤝️ Offer {offer_id} does not exist");
                OfferCloseResult::NotFound
            },
            Err(e) => {
                error!("🤝️ Could not read offer {offer_id}. {e}");
                OfferCloseResult::Failed(e.to_string())
            },
        }
    }
}
