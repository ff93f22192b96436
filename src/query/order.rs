use super::predicate::quote_column;

/// Sortable fields exposed on the list endpoint, mapped to columns.
const SORTABLE: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("title", "title"),
    ("authorName", "author_name"),
    ("sellingPrice", "selling_price"),
    ("quantity", "quantity"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("Cannot sort by '{0}'")]
    UnknownField(String),
    #[error("Sort order must be 'asc' or 'desc'")]
    InvalidDirection(String),
}

/// A resolved sort clause. Defaults to newest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: "created_at",
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    /// Resolve optional user input against the whitelist.
    pub fn parse(field: Option<&str>, direction: Option<&str>) -> Result<Self, SortError> {
        let column = match field {
            Some(name) => SORTABLE
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, column)| *column)
                .ok_or_else(|| SortError::UnknownField(name.to_string()))?,
            None => "created_at",
        };

        let direction = match direction {
            Some(value) if value.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(value) if value.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(value) => return Err(SortError::InvalidDirection(value.to_string())),
            None => SortDirection::Desc,
        };

        Ok(Self { column, direction })
    }

    pub fn to_sql(&self, qualifier: Option<&str>) -> String {
        format!(
            "{} {}",
            quote_column(self.column, qualifier),
            self.direction.as_sql()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_created_at_descending() {
        let sort = SortSpec::parse(None, None).unwrap();

        assert_eq!(sort, SortSpec::default());
        assert_eq!(sort.to_sql(Some("b")), "b.\"created_at\" DESC");
    }

    #[test]
    fn maps_api_field_names_to_columns() {
        let sort = SortSpec::parse(Some("sellingPrice"), Some("asc")).unwrap();

        assert_eq!(sort.column, "selling_price");
        assert_eq!(sort.direction, SortDirection::Asc);
    }

    #[test]
    fn rejects_fields_outside_the_whitelist() {
        let err = SortSpec::parse(Some("password_hash"), None).unwrap_err();

        assert!(matches!(err, SortError::UnknownField(_)));
        assert_eq!(err.to_string(), "Cannot sort by 'password_hash'");
    }

    #[test]
    fn rejects_unknown_directions() {
        let err = SortSpec::parse(Some("title"), Some("sideways")).unwrap_err();

        assert!(matches!(err, SortError::InvalidDirection(_)));
    }
}
