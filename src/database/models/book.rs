use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Genres accepted by the API. Persisted as text under a CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Genre {
    Fiction,
    NonFiction,
}

impl Genre {
    pub const ALL: [Genre; 2] = [Genre::Fiction, Genre::NonFiction];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-Fiction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Genre::ALL.iter().copied().find(|genre| genre.as_str() == value)
    }
}

/// Database row for a book. `added_by_name` is filled when the query joins
/// the users table and defaults to `None` otherwise.
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: Uuid,
    pub title: String,
    pub genre: String,
    pub description: String,
    pub author_name: String,
    pub cover_image_url: String,
    pub cover_image_id: String,
    pub selling_price: Decimal,
    pub buying_price: Decimal,
    pub discount_price: Option<Decimal>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    pub quantity: i32,
    pub added_by: Uuid,
    pub organization: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub added_by_name: Option<String>,
}

/// Creator reference embedded in book payloads.
#[derive(Debug, Clone, Serialize)]
pub struct CreatorRef {
    pub id: Uuid,
    pub name: String,
}

/// API view of a book. The owning tenant and the image host id stay
/// internal; absent discount fields are omitted from the payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub genre: String,
    pub description: String,
    pub author_name: String,
    pub cover_image_url: String,
    pub selling_price: Decimal,
    pub buying_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_end_date: Option<DateTime<Utc>>,
    pub quantity: i32,
    pub added_by: CreatorRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            genre: row.genre,
            description: row.description,
            author_name: row.author_name,
            cover_image_url: row.cover_image_url,
            selling_price: row.selling_price,
            buying_price: row.buying_price,
            discount_price: row.discount_price,
            discount_start_date: row.discount_start_date,
            discount_end_date: row.discount_end_date,
            quantity: row.quantity,
            added_by: CreatorRef {
                id: row.added_by,
                name: row.added_by_name.unwrap_or_default(),
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
