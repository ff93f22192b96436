use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::{Book, TenantSummary};
use crate::database::{BookChanges, BookFilters, BookStore, NewBook};
use crate::error::ApiError;
use crate::media::{self, ImageHost, StagedUpload, UploadOptions};
use crate::middleware::{AuthContext, PageInfo};
use crate::query::{SortSpec, SqlParam};
use crate::validation;

/// Validated book fields before a cover image exists for them.
#[derive(Debug, Clone)]
pub struct BookDraft {
    pub title: String,
    pub genre: String,
    pub description: String,
    pub author_name: String,
    pub selling_price: Decimal,
    pub buying_price: Decimal,
    pub discount_price: Option<Decimal>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    pub quantity: i32,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub author_name: Option<String>,
    pub selling_price: Option<Decimal>,
    pub buying_price: Option<Decimal>,
    pub discount_price: Option<Decimal>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    pub quantity: Option<i32>,
}

/// A cover image as it arrived in the multipart request.
#[derive(Debug, Clone)]
pub struct CoverUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Inventory operations, always exercised through a caller's tenant.
#[derive(Clone)]
pub struct BookService {
    store: BookStore,
    images: Arc<dyn ImageHost>,
    upload_folder: String,
    staging_dir: PathBuf,
    page_size: i64,
}

impl BookService {
    pub fn new(store: BookStore, images: Arc<dyn ImageHost>, config: &AppConfig) -> Self {
        Self {
            store,
            images,
            upload_folder: config.media.upload_folder.clone(),
            staging_dir: config.media.staging_dir.clone(),
            page_size: config.api.page_size,
        }
    }

    pub async fn create(
        &self,
        caller: &AuthContext,
        draft: BookDraft,
        cover: CoverUpload,
    ) -> Result<Book, ApiError> {
        let staged = StagedUpload::stage(&self.staging_dir, &cover.file_name, &cover.bytes).await?;
        let uploaded = self
            .images
            .upload(staged.path(), &self.upload_options())
            .await?;

        let created = self
            .store
            .scoped(caller.organization)
            .create(
                caller.user_id,
                NewBook {
                    title: draft.title,
                    genre: draft.genre,
                    description: draft.description,
                    author_name: draft.author_name,
                    cover_image_url: uploaded.public_url,
                    cover_image_id: uploaded.public_id.clone(),
                    selling_price: draft.selling_price,
                    buying_price: draft.buying_price,
                    discount_price: draft.discount_price,
                    discount_start_date: draft.discount_start_date,
                    discount_end_date: draft.discount_end_date,
                    quantity: draft.quantity,
                },
            )
            .await;

        let mut row = match created {
            Ok(row) => row,
            Err(err) => {
                // The record never landed; don't strand the hosted image.
                media::release_image(self.images.clone(), uploaded.public_id);
                return Err(err.into());
            }
        };
        row.added_by_name = Some(caller.name.clone());

        info!(book_id = %row.id, "book created");
        Ok(Book::from(row))
    }

    pub async fn list(
        &self,
        caller: &AuthContext,
        filters: BookFilters,
        sort: SortSpec,
        page: i64,
    ) -> Result<(Vec<Book>, PageInfo), ApiError> {
        let page = page.max(1);
        let books = self.store.scoped(caller.organization);

        let (rows, total) = tokio::try_join!(
            books.list(&filters, &sort, page, self.page_size),
            books.count(&filters)
        )?;

        let pagination = PageInfo::new(total, page, self.page_size);
        Ok((rows.into_iter().map(Book::from).collect(), pagination))
    }

    pub async fn get(&self, caller: &AuthContext, id: Uuid) -> Result<Book, ApiError> {
        let row = self
            .store
            .scoped(caller.organization)
            .get(id)
            .await?
            .ok_or_else(ApiError::book_not_found)?;

        Ok(Book::from(row))
    }

    /// Apply a partial update. Cross-field discount rules are checked over
    /// the merged record, not the patch alone. When a new cover arrives,
    /// the old hosted image is released only after the update lands.
    pub async fn update(
        &self,
        caller: &AuthContext,
        id: Uuid,
        patch: BookPatch,
        new_cover: Option<CoverUpload>,
    ) -> Result<Book, ApiError> {
        let books = self.store.scoped(caller.organization);
        let existing = books.get(id).await?.ok_or_else(ApiError::book_not_found)?;

        validation::check_merged_discount(
            patch.discount_price.or(existing.discount_price).is_some(),
            patch.discount_start_date.or(existing.discount_start_date),
            patch.discount_end_date.or(existing.discount_end_date),
        )?;

        let mut changes = BookChanges::default();
        if let Some(title) = patch.title {
            changes.set("title", SqlParam::Text(title));
        }
        if let Some(genre) = patch.genre {
            changes.set("genre", SqlParam::Text(genre));
        }
        if let Some(description) = patch.description {
            changes.set("description", SqlParam::Text(description));
        }
        if let Some(author_name) = patch.author_name {
            changes.set("author_name", SqlParam::Text(author_name));
        }
        if let Some(selling_price) = patch.selling_price {
            changes.set("selling_price", SqlParam::Decimal(selling_price));
        }
        if let Some(buying_price) = patch.buying_price {
            changes.set("buying_price", SqlParam::Decimal(buying_price));
        }
        if let Some(discount_price) = patch.discount_price {
            changes.set("discount_price", SqlParam::Decimal(discount_price));
        }
        if let Some(start) = patch.discount_start_date {
            changes.set("discount_start_date", SqlParam::Timestamp(start));
        }
        if let Some(end) = patch.discount_end_date {
            changes.set("discount_end_date", SqlParam::Timestamp(end));
        }
        if let Some(quantity) = patch.quantity {
            changes.set("quantity", SqlParam::Int(i64::from(quantity)));
        }

        let mut uploaded_id = None;
        let mut replaced_id = None;
        if let Some(cover) = new_cover {
            let staged =
                StagedUpload::stage(&self.staging_dir, &cover.file_name, &cover.bytes).await?;
            let uploaded = self
                .images
                .upload(staged.path(), &self.upload_options())
                .await?;

            changes.set("cover_image_url", SqlParam::Text(uploaded.public_url));
            changes.set("cover_image_id", SqlParam::Text(uploaded.public_id.clone()));
            uploaded_id = Some(uploaded.public_id);
            replaced_id = Some(existing.cover_image_id.clone());
        }

        if changes.is_empty() {
            return Ok(Book::from(existing));
        }

        let row = match books.update(id, &changes).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                // Deleted between the read and the write.
                if let Some(public_id) = uploaded_id {
                    media::release_image(self.images.clone(), public_id);
                }
                return Err(ApiError::book_not_found());
            }
            Err(err) => {
                if let Some(public_id) = uploaded_id {
                    media::release_image(self.images.clone(), public_id);
                }
                return Err(err.into());
            }
        };

        if let Some(public_id) = replaced_id {
            media::release_image(self.images.clone(), public_id);
        }

        info!(book_id = %row.id, changed = changes.len(), "book updated");
        Ok(Book::from(row))
    }

    /// Delete a book and release its hosted cover image.
    pub async fn delete(&self, caller: &AuthContext, id: Uuid) -> Result<(), ApiError> {
        let cover_image_id = self
            .store
            .scoped(caller.organization)
            .delete(id)
            .await?
            .ok_or_else(ApiError::book_not_found)?;

        media::release_image(self.images.clone(), cover_image_id);

        info!(book_id = %id, "book deleted");
        Ok(())
    }

    pub async fn summary(&self, caller: &AuthContext) -> Result<TenantSummary, ApiError> {
        Ok(self.store.scoped(caller.organization).summary().await?)
    }

    fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            folder: self.upload_folder.clone(),
        }
    }
}
