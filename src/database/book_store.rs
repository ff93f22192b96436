use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::models::{BookRow, Genre, RecentBook, TenantSummary};
use super::StoreError;
use crate::query::{bind_param_query_as, Predicate, PredicateSet, SortSpec, SqlParam};

/// Book columns selected for API payloads, qualified for the users join.
const BOOK_COLUMNS: &str = "b.\"id\", b.\"title\", b.\"genre\", b.\"description\", \
     b.\"author_name\", b.\"cover_image_url\", b.\"cover_image_id\", \
     b.\"selling_price\", b.\"buying_price\", b.\"discount_price\", \
     b.\"discount_start_date\", b.\"discount_end_date\", b.\"quantity\", \
     b.\"added_by\", b.\"organization\", b.\"created_at\", b.\"updated_at\"";

/// Optional list filters. Every present filter conjoins with the rest.
#[derive(Debug, Clone, Default)]
pub struct BookFilters {
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub genre: Option<Genre>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
}

/// Field values for a new book record.
#[derive(Debug, Clone)]
pub struct NewBook {
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
}

/// A partial update. Only the named columns change; `updated_at` is always
/// refreshed by the statement itself.
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    items: Vec<(&'static str, SqlParam)>,
}

impl BookChanges {
    pub fn set(&mut self, column: &'static str, value: SqlParam) {
        self.items.push((column, value));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Storage for book records. All access goes through a tenant-scoped handle.
#[derive(Debug, Clone)]
pub struct BookStore {
    pool: PgPool,
}

impl BookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bind a handle to one tenant. Every statement the handle issues
    /// carries the tenant condition.
    pub fn scoped(&self, tenant: Uuid) -> ScopedBooks<'_> {
        ScopedBooks {
            pool: &self.pool,
            tenant,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScopedBooks<'a> {
    pool: &'a PgPool,
    tenant: Uuid,
}

impl ScopedBooks<'_> {
    pub async fn create(&self, added_by: Uuid, book: NewBook) -> Result<BookRow, StoreError> {
        let row = sqlx::query_as::<_, BookRow>(
            "INSERT INTO books \
                 (id, title, genre, description, author_name, cover_image_url, cover_image_id, \
                  selling_price, buying_price, discount_price, discount_start_date, \
                  discount_end_date, quantity, added_by, organization) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(book.title)
        .bind(book.genre)
        .bind(book.description)
        .bind(book.author_name)
        .bind(book.cover_image_url)
        .bind(book.cover_image_id)
        .bind(book.selling_price)
        .bind(book.buying_price)
        .bind(book.discount_price)
        .bind(book.discount_start_date)
        .bind(book.discount_end_date)
        .bind(book.quantity)
        .bind(added_by)
        .bind(self.tenant)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<BookRow>, StoreError> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS}, u.\"name\" AS added_by_name \
             FROM books b JOIN users u ON u.\"id\" = b.\"added_by\" \
             WHERE b.\"id\" = $1 AND b.\"organization\" = $2"
        );

        let row = sqlx::query_as::<_, BookRow>(&sql)
            .bind(id)
            .bind(self.tenant)
            .fetch_optional(self.pool)
            .await?;

        Ok(row)
    }

    pub async fn list(
        &self,
        filters: &BookFilters,
        sort: &SortSpec,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<BookRow>, StoreError> {
        let (sql, params) = list_sql(self.tenant, filters, sort, page, page_size);

        let mut query = sqlx::query_as::<_, BookRow>(&sql);
        for param in params {
            query = bind_param_query_as(query, param);
        }

        Ok(query.fetch_all(self.pool).await?)
    }

    pub async fn count(&self, filters: &BookFilters) -> Result<i64, StoreError> {
        let (sql, params) = count_sql(self.tenant, filters);

        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        for param in params {
            query = bind_param_query_as(query, param);
        }

        Ok(query.fetch_one(self.pool).await?.0)
    }

    /// Apply a partial update in one conditional statement. Returns `None`
    /// when no row matches the id within this tenant.
    pub async fn update(
        &self,
        id: Uuid,
        changes: &BookChanges,
    ) -> Result<Option<BookRow>, StoreError> {
        let (sql, params) = update_sql(self.tenant, id, changes);

        let mut query = sqlx::query_as::<_, BookRow>(&sql);
        for param in params {
            query = bind_param_query_as(query, param);
        }

        Ok(query.fetch_optional(self.pool).await?)
    }

    /// Delete in one conditional statement. Returns the stored image id so
    /// the caller can release the hosted cover, or `None` when no row
    /// matched within this tenant.
    pub async fn delete(&self, id: Uuid) -> Result<Option<String>, StoreError> {
        let row = sqlx::query_as::<_, (String,)>(
            "DELETE FROM books \
             WHERE \"id\" = $1 AND \"organization\" = $2 \
             RETURNING \"cover_image_id\"",
        )
        .bind(id)
        .bind(self.tenant)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(cover_image_id,)| cover_image_id))
    }

    pub async fn summary(&self) -> Result<TenantSummary, StoreError> {
        let (totals, genre_counts, recent_books) = tokio::try_join!(
            self.stock_totals(),
            self.genre_counts(),
            self.recent_books()
        )?;
        let (total_books, books_in_stock, books_out_of_stock, total_inventory_value) = totals;

        Ok(TenantSummary {
            total_books,
            books_in_stock,
            books_out_of_stock,
            genre_counts,
            total_inventory_value,
            recent_books,
        })
    }

    async fn stock_totals(&self) -> Result<(i64, i64, i64, Decimal), StoreError> {
        let row = sqlx::query_as::<_, (i64, i64, i64, Decimal)>(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE \"quantity\" > 0), \
                    COUNT(*) FILTER (WHERE \"quantity\" = 0), \
                    COALESCE(SUM(\"buying_price\" * \"quantity\"), 0) \
             FROM books WHERE \"organization\" = $1",
        )
        .bind(self.tenant)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    async fn genre_counts(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT \"genre\", COUNT(*) FROM books \
             WHERE \"organization\" = $1 GROUP BY \"genre\"",
        )
        .bind(self.tenant)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn recent_books(&self) -> Result<Vec<RecentBook>, StoreError> {
        let rows = sqlx::query_as::<_, RecentBook>(
            "SELECT b.\"title\", b.\"author_name\", b.\"cover_image_url\", \
                    b.\"created_at\", u.\"name\" AS added_by \
             FROM books b JOIN users u ON u.\"id\" = b.\"added_by\" \
             WHERE b.\"organization\" = $1 \
             ORDER BY b.\"created_at\" DESC LIMIT 5",
        )
        .bind(self.tenant)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

fn filter_predicates(tenant: Uuid, filters: &BookFilters) -> PredicateSet {
    let mut predicates = PredicateSet::scoped_to(tenant);

    if let Some(title) = &filters.title {
        predicates.push(Predicate::ContainsInsensitive("title", title.clone()));
    }
    if let Some(author_name) = &filters.author_name {
        predicates.push(Predicate::ContainsInsensitive(
            "author_name",
            author_name.clone(),
        ));
    }
    if let Some(genre) = filters.genre {
        predicates.push(Predicate::Eq(
            "genre",
            SqlParam::Text(genre.as_str().to_string()),
        ));
    }
    if let Some(min_price) = filters.min_price {
        predicates.push(Predicate::Gte("selling_price", SqlParam::Decimal(min_price)));
    }
    if let Some(max_price) = filters.max_price {
        predicates.push(Predicate::Lte("selling_price", SqlParam::Decimal(max_price)));
    }
    match filters.in_stock {
        Some(true) => predicates.push(Predicate::Gt("quantity", SqlParam::Int(0))),
        Some(false) => predicates.push(Predicate::Eq("quantity", SqlParam::Int(0))),
        None => {}
    }

    predicates
}

fn list_sql(
    tenant: Uuid,
    filters: &BookFilters,
    sort: &SortSpec,
    page: i64,
    page_size: i64,
) -> (String, Vec<SqlParam>) {
    let (where_sql, params) = filter_predicates(tenant, filters).to_sql(Some("b"), 1);
    let offset = (page.max(1) - 1) * page_size;

    let sql = format!(
        "SELECT {BOOK_COLUMNS}, u.\"name\" AS added_by_name \
         FROM books b JOIN users u ON u.\"id\" = b.\"added_by\" \
         WHERE {where_sql} \
         ORDER BY {} LIMIT {page_size} OFFSET {offset}",
        sort.to_sql(Some("b"))
    );

    (sql, params)
}

fn count_sql(tenant: Uuid, filters: &BookFilters) -> (String, Vec<SqlParam>) {
    let (where_sql, params) = filter_predicates(tenant, filters).to_sql(None, 1);
    (
        format!("SELECT COUNT(*) FROM books WHERE {where_sql}"),
        params,
    )
}

fn update_sql(tenant: Uuid, id: Uuid, changes: &BookChanges) -> (String, Vec<SqlParam>) {
    let mut assignments = Vec::with_capacity(changes.items.len() + 1);
    let mut params = Vec::with_capacity(changes.items.len() + 2);
    let mut index = 1;

    for (column, value) in &changes.items {
        assignments.push(format!("\"{}\" = ${}", column, index));
        params.push(value.clone());
        index += 1;
    }
    assignments.push("\"updated_at\" = now()".to_string());

    let sql = format!(
        "UPDATE books AS b SET {} FROM users u \
         WHERE b.\"id\" = ${} AND b.\"organization\" = ${} AND u.\"id\" = b.\"added_by\" \
         RETURNING {BOOK_COLUMNS}, u.\"name\" AS added_by_name",
        assignments.join(", "),
        index,
        index + 1,
    );
    params.push(SqlParam::Uuid(id));
    params.push(SqlParam::Uuid(tenant));

    (sql, params)
}
