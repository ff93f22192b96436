use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;
use sqlx::Postgres;
use uuid::Uuid;

/// Typed bind parameter for runtime-built SQL. Keeping the Rust type
/// explicit lets sqlx bind with the correct Postgres type instead of
/// sending everything as text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Uuid(Uuid),
    Text(String),
    Int(i64),
    Decimal(Decimal),
    Timestamp(DateTime<Utc>),
}

/// Bind one parameter onto a typed query, preserving its SQL type.
pub fn bind_param_query_as<'q, T>(
    query: sqlx::query::QueryAs<'q, Postgres, T, PgArguments>,
    param: SqlParam,
) -> sqlx::query::QueryAs<'q, Postgres, T, PgArguments> {
    match param {
        SqlParam::Uuid(value) => query.bind(value),
        SqlParam::Text(value) => query.bind(value),
        SqlParam::Int(value) => query.bind(value),
        SqlParam::Decimal(value) => query.bind(value),
        SqlParam::Timestamp(value) => query.bind(value),
    }
}
