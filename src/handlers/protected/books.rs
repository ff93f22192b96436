use axum::extract::{Multipart, Path, Query, State};
use axum::Extension;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::database::models::{Book, Genre};
use crate::database::BookFilters;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::query::{SortError, SortSpec};
use crate::services::{BookDraft, BookPatch, CoverUpload};
use crate::state::AppState;
use crate::validation::{self, parse_json_body, Sanitize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_create_discounts))]
pub struct CreateBookRequest {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Title must be between 3 and 100 characters"
    ))]
    pub title: String,
    #[validate(custom(function = validate_genre))]
    pub genre: String,
    #[validate(length(
        min = 10,
        max = 500,
        message = "Description must be between 10 and 500 characters"
    ))]
    pub description: String,
    #[validate(length(
        min = 3,
        max = 50,
        message = "Author name must be between 3 and 50 characters"
    ))]
    pub author_name: String,
    #[validate(range(min = 0.0, message = "Selling price cannot be negative"))]
    pub selling_price: f64,
    #[validate(range(min = 0.0, message = "Buying price cannot be negative"))]
    pub buying_price: f64,
    #[validate(range(min = 0.0, message = "Discount price cannot be negative"))]
    pub discount_price: Option<f64>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
}

impl Sanitize for CreateBookRequest {
    fn sanitize(&mut self) {
        self.title = self.title.trim().to_string();
        self.genre = self.genre.trim().to_string();
        self.description = self.description.trim().to_string();
        self.author_name = self.author_name.trim().to_string();
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Title must be between 3 and 100 characters"
    ))]
    pub title: Option<String>,
    #[validate(custom(function = validate_genre))]
    pub genre: Option<String>,
    #[validate(length(
        min = 10,
        max = 500,
        message = "Description must be between 10 and 500 characters"
    ))]
    pub description: Option<String>,
    #[validate(length(
        min = 3,
        max = 50,
        message = "Author name must be between 3 and 50 characters"
    ))]
    pub author_name: Option<String>,
    #[validate(range(min = 0.0, message = "Selling price cannot be negative"))]
    pub selling_price: Option<f64>,
    #[validate(range(min = 0.0, message = "Buying price cannot be negative"))]
    pub buying_price: Option<f64>,
    #[validate(range(min = 0.0, message = "Discount price cannot be negative"))]
    pub discount_price: Option<f64>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
}

impl Sanitize for UpdateBookRequest {
    fn sanitize(&mut self) {
        for field in [
            &mut self.title,
            &mut self.genre,
            &mut self.description,
            &mut self.author_name,
        ] {
            if let Some(value) = field {
                *value = value.trim().to_string();
            }
        }
    }
}

fn validate_genre(genre: &str) -> Result<(), ValidationError> {
    if Genre::parse(genre).is_some() {
        return Ok(());
    }

    let mut error = ValidationError::new("genre");
    error.message = Some("Genre must be either Fiction or Non-Fiction".into());
    Err(error)
}

fn validate_create_discounts(request: &CreateBookRequest) -> Result<(), ValidationError> {
    match validation::discount_rules_error(
        request.discount_price.is_some(),
        request.discount_start_date,
        request.discount_end_date,
    ) {
        None => Ok(()),
        Some(error) => Err(error),
    }
}

/// POST /books - Add a book; multipart with a "data" JSON part and an
/// "image" file part
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    multipart: Multipart,
) -> ApiResult<Book> {
    let form = read_book_form(multipart).await?;

    let data = form.data.ok_or_else(ApiError::empty_body)?;
    let request: CreateBookRequest = parse_json_body(&data)?;
    let cover = form.image.ok_or_else(|| {
        ApiError::validation_fields(HashMap::from([(
            "image".to_string(),
            "Cover image is required".to_string(),
        )]))
    })?;

    let book = state
        .books
        .create(&caller, draft_from_request(request)?, cover)
        .await?;

    Ok(ApiResponse::created(book, "Book created successfully"))
}

/// GET /books - Filtered, paginated inventory listing
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Vec<Book>> {
    let query = ListQuery::from_params(&params)?;

    let (books, pagination) = state
        .books
        .list(&caller, query.filters, query.sort, query.page)
        .await?;

    Ok(ApiResponse::with_pagination(books, pagination))
}

/// GET /books/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Book> {
    let id = parse_book_id(&id)?;
    let book = state.books.get(&caller, id).await?;

    Ok(ApiResponse::success(book))
}

/// PATCH /books/:id - Partial update; multipart with optional "data" and
/// "image" parts, at least one required
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Book> {
    let id = parse_book_id(&id)?;
    let form = read_book_form(multipart).await?;

    if form.data.is_none() && form.image.is_none() {
        return Err(ApiError::empty_body());
    }

    let request = match form.data {
        Some(data) => parse_json_body::<UpdateBookRequest>(&data)?,
        None => UpdateBookRequest::default(),
    };

    let book = state
        .books
        .update(&caller, id, patch_from_request(request)?, form.image)
        .await?;

    Ok(ApiResponse::with_message(book, "Book updated successfully"))
}

/// DELETE /books/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_book_id(&id)?;
    state.books.delete(&caller, id).await?;

    Ok(ApiResponse::message_only("Book deleted successfully"))
}

struct BookForm {
    data: Option<Vec<u8>>,
    image: Option<CoverUpload>,
}

async fn read_book_form(mut multipart: Multipart) -> Result<BookForm, ApiError> {
    let mut data = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::validation(err.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::validation(err.to_string()))?;
                data = Some(text.into_bytes());
            }
            Some("image") => {
                let file_name = field.file_name().unwrap_or("cover").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::validation(err.to_string()))?;
                image = Some(CoverUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(BookForm { data, image })
}

fn parse_book_id(raw: &str) -> Result<Uuid, ApiError> {
    // Unparseable ids cannot name a book, so they read as absent.
    Uuid::parse_str(raw).map_err(|_| ApiError::book_not_found())
}

fn draft_from_request(request: CreateBookRequest) -> Result<BookDraft, ApiError> {
    Ok(BookDraft {
        title: request.title,
        genre: request.genre,
        description: request.description,
        author_name: request.author_name,
        selling_price: validation::price_to_decimal(request.selling_price, "sellingPrice")?,
        buying_price: validation::price_to_decimal(request.buying_price, "buyingPrice")?,
        discount_price: request
            .discount_price
            .map(|value| validation::price_to_decimal(value, "discountPrice"))
            .transpose()?,
        discount_start_date: request.discount_start_date,
        discount_end_date: request.discount_end_date,
        quantity: request.quantity,
    })
}

fn patch_from_request(request: UpdateBookRequest) -> Result<BookPatch, ApiError> {
    Ok(BookPatch {
        title: request.title,
        genre: request.genre,
        description: request.description,
        author_name: request.author_name,
        selling_price: request
            .selling_price
            .map(|value| validation::price_to_decimal(value, "sellingPrice"))
            .transpose()?,
        buying_price: request
            .buying_price
            .map(|value| validation::price_to_decimal(value, "buyingPrice"))
            .transpose()?,
        discount_price: request
            .discount_price
            .map(|value| validation::price_to_decimal(value, "discountPrice"))
            .transpose()?,
        discount_start_date: request.discount_start_date,
        discount_end_date: request.discount_end_date,
        quantity: request.quantity,
    })
}

struct ListQuery {
    filters: BookFilters,
    sort: SortSpec,
    page: i64,
}

impl ListQuery {
    fn from_params(params: &HashMap<String, String>) -> Result<Self, ApiError> {
        let mut errors = HashMap::new();

        let present = |key: &str| params.get(key).filter(|value| !value.is_empty());

        let genre = present("genre").and_then(|raw| match Genre::parse(raw) {
            Some(genre) => Some(genre),
            None => {
                errors.insert(
                    "genre".to_string(),
                    "Genre must be either Fiction or Non-Fiction".to_string(),
                );
                None
            }
        });

        let mut price = |key: &str, label: &str| {
            present(key).and_then(|raw| match raw.parse::<Decimal>() {
                Ok(value) => Some(value),
                Err(_) => {
                    errors.insert(key.to_string(), format!("{} must be a number", label));
                    None
                }
            })
        };
        let min_price = price("minPrice", "Minimum price");
        let max_price = price("maxPrice", "Maximum price");

        let in_stock = present("inStock").and_then(|raw| match raw.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => {
                errors.insert(
                    "inStock".to_string(),
                    "inStock must be 'true' or 'false'".to_string(),
                );
                None
            }
        });

        let page = match present("page") {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(value) => value.max(1),
                Err(_) => {
                    errors.insert(
                        "page".to_string(),
                        "Page must be a positive number".to_string(),
                    );
                    1
                }
            },
        };

        let sort = match SortSpec::parse(
            present("sortBy").map(String::as_str),
            present("sortOrder").map(String::as_str),
        ) {
            Ok(sort) => sort,
            Err(err) => {
                let key = match err {
                    SortError::UnknownField(_) => "sortBy",
                    SortError::InvalidDirection(_) => "sortOrder",
                };
                errors.insert(key.to_string(), err.to_string());
                SortSpec::default()
            }
        };

        if !errors.is_empty() {
            return Err(ApiError::validation_fields(errors));
        }

        Ok(Self {
            filters: BookFilters {
                title: present("title").cloned(),
                author_name: present("authorName").cloned(),
                genre,
                min_price,
                max_price,
                in_stock,
            },
            sort,
            page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn expect_field_errors(err: ApiError) -> HashMap<String, String> {
        match err {
            ApiError::Validation {
                field_errors: Some(fields),
                ..
            } => fields,
            other => panic!("expected field errors, got {:?}", other),
        }
    }

    #[test]
    fn empty_params_mean_first_page_newest_first() {
        let query = ListQuery::from_params(&params(&[])).unwrap();

        assert_eq!(query.page, 1);
        assert_eq!(query.sort, SortSpec::default());
        assert!(query.filters.title.is_none());
        assert!(query.filters.in_stock.is_none());
    }

    #[test]
    fn filters_parse_from_camel_case_params() {
        let query = ListQuery::from_params(&params(&[
            ("title", "dune"),
            ("authorName", "herbert"),
            ("genre", "Fiction"),
            ("minPrice", "5"),
            ("maxPrice", "25.50"),
            ("inStock", "true"),
            ("page", "2"),
            ("sortBy", "sellingPrice"),
            ("sortOrder", "asc"),
        ]))
        .unwrap();

        assert_eq!(query.filters.title.as_deref(), Some("dune"));
        assert_eq!(query.filters.genre, Some(Genre::Fiction));
        assert_eq!(query.filters.max_price, Some(Decimal::new(2550, 2)));
        assert_eq!(query.filters.in_stock, Some(true));
        assert_eq!(query.page, 2);
        assert_eq!(query.sort.column, "selling_price");
    }

    #[test]
    fn bad_params_come_back_as_field_errors() {
        let err = ListQuery::from_params(&params(&[
            ("genre", "Mystery"),
            ("minPrice", "cheap"),
            ("inStock", "yes"),
            ("sortBy", "password_hash"),
        ]))
        .unwrap_err();
        let fields = expect_field_errors(err);

        assert_eq!(fields.len(), 4);
        assert_eq!(
            fields.get("genre"),
            Some(&"Genre must be either Fiction or Non-Fiction".to_string())
        );
        assert_eq!(
            fields.get("sortBy"),
            Some(&"Cannot sort by 'password_hash'".to_string())
        );
    }

    #[test]
    fn zero_and_negative_pages_clamp_to_one() {
        for raw in ["0", "-3"] {
            let query = ListQuery::from_params(&params(&[("page", raw)])).unwrap();
            assert_eq!(query.page, 1, "page {}", raw);
        }
    }

    #[test]
    fn unparseable_ids_read_as_absent_books() {
        let err = parse_book_id("not-a-uuid").unwrap_err();

        assert_eq!(err.message(), "Book not found");
    }

    #[test]
    fn create_requests_enforce_the_discount_trio() {
        let err = parse_json_body::<CreateBookRequest>(
            br#"{
                "title": "Dune",
                "genre": "Fiction",
                "description": "Spice, sand and politics.",
                "authorName": "Frank Herbert",
                "sellingPrice": 25.0,
                "buyingPrice": 18.0,
                "discountPrice": 19.99,
                "quantity": 4
            }"#,
        )
        .unwrap_err();
        let fields = expect_field_errors(err);

        assert_eq!(
            fields.get("discountPrice"),
            Some(&validation::DISCOUNT_TRIO_MESSAGE.to_string())
        );
    }

    #[test]
    fn update_requests_accept_sparse_patches() {
        let request: UpdateBookRequest =
            parse_json_body(br#"{"quantity": 0, "title": "  Dune Messiah  "}"#).unwrap();

        assert_eq!(request.quantity, Some(0));
        assert_eq!(request.title.as_deref(), Some("Dune Messiah"));
        assert!(request.genre.is_none());

        let patch = patch_from_request(request).unwrap();
        assert_eq!(patch.quantity, Some(0));
        assert!(patch.selling_price.is_none());
    }

    #[test]
    fn negative_prices_are_rejected_per_field() {
        let err = parse_json_body::<UpdateBookRequest>(br#"{"sellingPrice": -1.0}"#).unwrap_err();
        let fields = expect_field_errors(err);

        assert_eq!(
            fields.get("sellingPrice"),
            Some(&"Selling price cannot be negative".to_string())
        );
    }
}
