use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ListingStock, NewListing},
    traits::ListingStoreError,
};

pub async fn fetch_listing_stock(
    listing_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ListingStock>, sqlx::Error> {
    let stock = sqlx::query_as(
        "SELECT listing_id, quantity, status, sold_at, updated_at FROM listings WHERE listing_id = $1",
    )
    .bind(listing_id)
    .fetch_optional(conn)
    .await?;
    Ok(stock)
}

/// Takes `quantity` units off a listing in a single statement, so concurrent orders never overwrite each other's
/// decrement. Stock stops at zero, at which point the listing is marked sold and `sold_at` is set (once). A listing
/// with stock left keeps `draft` if it was a draft and becomes `active` otherwise.
pub async fn decrement_listing_stock(
    listing_id: &str,
    quantity: i64,
    sold_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<ListingStock, ListingStoreError> {
    let stock: Option<ListingStock> = sqlx::query_as(
        r#"
        UPDATE listings SET
            quantity = MAX(quantity - $1, 0),
            status = CASE
                WHEN quantity - $1 <= 0 THEN 'sold'
                WHEN status = 'draft' THEN 'draft'
                ELSE 'active'
            END,
            sold_at = CASE WHEN quantity - $1 <= 0 THEN COALESCE(sold_at, $2) ELSE sold_at END,
            updated_at = CURRENT_TIMESTAMP
        WHERE listing_id = $3
        RETURNING listing_id, quantity, status, sold_at, updated_at
        "#,
    )
    .bind(quantity)
    .bind(sold_at)
    .bind(listing_id)
    .fetch_optional(conn)
    .await?;
    trace!("🏷️ Listing {listing_id} stock after taking {quantity}: {stock:?}");
    stock.ok_or_else(|| ListingStoreError::ListingNotFound(listing_id.to_string()))
}

/// Listings are owned by the listings subsystem. This exists for seeding and tests.
pub async fn insert_listing(listing: NewListing, conn: &mut SqliteConnection) -> Result<ListingStock, sqlx::Error> {
    let stock = sqlx::query_as(
        r#"
        INSERT INTO listings (listing_id, title, seller_id, price, quantity, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING listing_id, quantity, status, sold_at, updated_at
        "#,
    )
    .bind(listing.listing_id)
    .bind(listing.title)
    .bind(listing.seller_id)
    .bind(listing.price)
    .bind(listing.quantity)
    .bind(listing.status)
    .fetch_one(conn)
    .await?;
    Ok(stock)
}
