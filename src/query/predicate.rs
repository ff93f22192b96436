use uuid::Uuid;

use super::params::SqlParam;

/// One conjunctive condition over a whitelisted column. Column names are
/// `&'static str` so only compiled-in identifiers ever reach the SQL text.
#[derive(Debug, Clone)]
pub enum Predicate {
    Eq(&'static str, SqlParam),
    /// Case-insensitive substring match. LIKE wildcards in the needle are
    /// escaped so user input always matches literally.
    ContainsInsensitive(&'static str, String),
    Gte(&'static str, SqlParam),
    Lte(&'static str, SqlParam),
    Gt(&'static str, SqlParam),
}

/// Conjunctive predicate set pre-bound to one tenant. The only constructor
/// starts from the tenant condition, so no query built through this type
/// can drop the tenant scope.
#[derive(Debug, Clone)]
pub struct PredicateSet {
    items: Vec<Predicate>,
}

impl PredicateSet {
    pub fn scoped_to(tenant: Uuid) -> Self {
        Self {
            items: vec![Predicate::Eq("organization", SqlParam::Uuid(tenant))],
        }
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.items.push(predicate);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Render to `cond AND cond ...` with `$n` placeholders starting at
    /// `start_index`, returning the bind parameters in placeholder order.
    pub fn to_sql(&self, qualifier: Option<&str>, start_index: usize) -> (String, Vec<SqlParam>) {
        let mut conditions = Vec::with_capacity(self.items.len());
        let mut params = Vec::with_capacity(self.items.len());
        let mut index = start_index;

        for predicate in &self.items {
            let (column, operator, param) = match predicate {
                Predicate::Eq(column, param) => (column, "=", param.clone()),
                Predicate::Gte(column, param) => (column, ">=", param.clone()),
                Predicate::Lte(column, param) => (column, "<=", param.clone()),
                Predicate::Gt(column, param) => (column, ">", param.clone()),
                Predicate::ContainsInsensitive(column, needle) => {
                    let pattern = format!("%{}%", escape_like(needle));
                    (column, "ILIKE", SqlParam::Text(pattern))
                }
            };

            conditions.push(format!(
                "{} {} ${}",
                quote_column(column, qualifier),
                operator,
                index
            ));
            params.push(param);
            index += 1;
        }

        (conditions.join(" AND "), params)
    }
}

/// Quote an identifier, optionally qualified with a table alias.
pub(crate) fn quote_column(column: &str, qualifier: Option<&str>) -> String {
    match qualifier {
        Some(alias) => format!("{}.\"{}\"", alias, column),
        None => format!("\"{}\"", column),
    }
}

/// Escape backslash and LIKE wildcards; Postgres treats backslash as the
/// default LIKE escape character.
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_set_always_carries_the_tenant_condition() {
        let tenant = Uuid::new_v4();
        let predicates = PredicateSet::scoped_to(tenant);

        let (sql, params) = predicates.to_sql(None, 1);

        assert_eq!(sql, "\"organization\" = $1");
        assert_eq!(params, vec![SqlParam::Uuid(tenant)]);
    }

    #[test]
    fn conditions_join_with_and_and_number_sequentially() {
        let mut predicates = PredicateSet::scoped_to(Uuid::new_v4());
        predicates.push(Predicate::Gte(
            "selling_price",
            SqlParam::Int(5),
        ));
        predicates.push(Predicate::Gt("quantity", SqlParam::Int(0)));

        let (sql, params) = predicates.to_sql(Some("b"), 3);

        assert_eq!(
            sql,
            "b.\"organization\" = $3 AND b.\"selling_price\" >= $4 AND b.\"quantity\" > $5"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn contains_wraps_and_escapes_the_needle() {
        let mut predicates = PredicateSet::scoped_to(Uuid::new_v4());
        predicates.push(Predicate::ContainsInsensitive(
            "title",
            "100%_pure\\gold".to_string(),
        ));

        let (sql, params) = predicates.to_sql(None, 1);

        assert!(sql.ends_with("\"title\" ILIKE $2"));
        assert_eq!(
            params[1],
            SqlParam::Text("%100\\%\\_pure\\\\gold%".to_string())
        );
    }
}
