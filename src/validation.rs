use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::ApiError;

pub const DISCOUNT_TRIO_MESSAGE: &str =
    "Discount price, start date and end date must be provided together";
pub const DISCOUNT_WINDOW_MESSAGE: &str = "Discount end date cannot be before the start date";

/// Request-level cleanup applied after decoding, before validation.
pub trait Sanitize {
    fn sanitize(&mut self);
}

/// Decode a JSON request body into a validated request value.
///
/// Empty bodies, `null` and `{}` are rejected up front so every mutation
/// endpoint shares one "nothing to do" failure. Decode and rule failures
/// all surface through the standard error envelope.
pub fn parse_json_body<T>(bytes: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate + Sanitize,
{
    if bytes.iter().all(|byte| byte.is_ascii_whitespace()) {
        return Err(ApiError::empty_body());
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|_| ApiError::validation("Invalid JSON in request body"))?;

    if value.is_null() || value.as_object().is_some_and(|map| map.is_empty()) {
        return Err(ApiError::empty_body());
    }

    let mut request: T =
        serde_json::from_value(value).map_err(|err| ApiError::validation(err.to_string()))?;

    request.sanitize();
    request.validate()?;

    Ok(request)
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::validation_fields(flatten_field_errors(&errors))
    }
}

/// Flatten validator output to one message per field. Struct-level errors
/// land under `__all__`; those are re-keyed to the field named in their
/// `field` param.
pub fn flatten_field_errors(errors: &ValidationErrors) -> HashMap<String, String> {
    let mut flat = HashMap::new();

    for (field, kind) in errors.errors() {
        if let ValidationErrorsKind::Field(items) = kind {
            for item in items {
                let message = item
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));

                let key = if *field == "__all__" {
                    item.params
                        .get("field")
                        .and_then(|value| value.as_str())
                        .unwrap_or("body")
                        .to_string()
                } else {
                    field.to_string()
                };

                flat.entry(key).or_insert(message);
            }
        }
    }

    flat
}

/// Cross-field discount rules: the three fields travel together, and the
/// window must not end before it starts. Returns the first violation.
pub fn discount_rules_error(
    discount_price_present: bool,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<ValidationError> {
    let present = [discount_price_present, start.is_some(), end.is_some()]
        .iter()
        .filter(|present| **present)
        .count();

    if present != 0 && present != 3 {
        return Some(schema_error(
            "discount_trio",
            "discountPrice",
            DISCOUNT_TRIO_MESSAGE,
        ));
    }

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Some(schema_error(
                "discount_window",
                "discountEndDate",
                DISCOUNT_WINDOW_MESSAGE,
            ));
        }
    }

    None
}

/// Discount rules over an already-merged record, shaped as a field-error
/// response. Used by partial updates, where the rules apply to the result
/// of the merge rather than to the patch alone.
pub fn check_merged_discount(
    discount_price_present: bool,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), ApiError> {
    match discount_rules_error(discount_price_present, start, end) {
        None => Ok(()),
        Some(error) => {
            let field = error
                .params
                .get("field")
                .and_then(|value| value.as_str())
                .unwrap_or("discountPrice")
                .to_string();
            let message = error
                .message
                .as_ref()
                .map(|message| message.to_string())
                .unwrap_or_default();

            Err(ApiError::validation_fields(HashMap::from([(
                field, message,
            )])))
        }
    }
}

/// Prices arrive as JSON numbers; storage wants exact decimals.
pub fn price_to_decimal(value: f64, field: &'static str) -> Result<Decimal, ApiError> {
    Decimal::try_from(value).map_err(|_| {
        ApiError::validation_fields(HashMap::from([(
            field.to_string(),
            "Invalid price value".to_string(),
        )]))
    })
}

fn schema_error(code: &'static str, field: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error.add_param(Cow::Borrowed("field"), &field);
    error
}
