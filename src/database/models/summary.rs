use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeMap;

/// One of the most recently added books on the dashboard.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentBook {
    pub title: String,
    pub author_name: String,
    pub cover_image_url: String,
    pub created_at: DateTime<Utc>,
    /// Display name of the account that added the book.
    pub added_by: String,
}

/// Per-tenant inventory statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub total_books: i64,
    pub books_in_stock: i64,
    pub books_out_of_stock: i64,
    pub genre_counts: BTreeMap<String, i64>,
    /// Capital tied up in inventory: sum of buying price times quantity.
    pub total_inventory_value: Decimal,
    pub recent_books: Vec<RecentBook>,
}
