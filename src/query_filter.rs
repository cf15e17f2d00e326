//! Query Filter Builder
//!
//! Turns an ordered list of filter specifications into a parameterized
//! `WHERE ... ORDER BY ... LIMIT ... OFFSET ...` clause with `$n` placeholders,
//! plus the positional arguments bound to them.

use std::fmt;

use actix_web::{web, HttpRequest};

use crate::error::QueryError;

/// What a filter entry does
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Operation {
    #[default]
    Eq,
    /// Any other comparison operator (`>`, `<=`, `ILIKE`, ...)
    Compare(String),
    Order,
    Limit,
    Offset,
}

impl Operation {
    pub fn parse(op: &str) -> Self {
        match op {
            "" | "=" => Operation::Eq,
            "order" => Operation::Order,
            "limit" => Operation::Limit,
            "offset" => Operation::Offset,
            other => Operation::Compare(other.to_string()),
        }
    }

    fn operator(&self) -> &str {
        match self {
            Operation::Compare(op) => op,
            _ => "=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryFilter {
    /// Request parameter name; also the default column
    pub key: String,
    pub operation: Operation,
    /// Column override, used verbatim; required for `order`
    pub column: Option<String>,
    pub value: String,
    /// Bound when `value` is empty
    pub default: Option<String>,
    /// Predicate fragment AND-ed in verbatim
    pub raw: Option<String>,
}

impl QueryFilter {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn order(
        key: impl Into<String>,
        column: impl Into<String>,
        direction: impl Into<String>,
    ) -> Self {
        Self::new(key).op("order").column(column).value(direction)
    }

    pub fn limit(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key).op("limit").value(value)
    }

    pub fn offset(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key).op("offset").value(value)
    }

    pub fn raw(fragment: impl Into<String>) -> Self {
        Self {
            raw: Some(fragment.into()),
            ..Self::default()
        }
    }

    pub fn op(mut self, op: &str) -> Self {
        self.operation = Operation::parse(op);
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn bound_value(&self) -> String {
        match &self.default {
            Some(default) if self.value.is_empty() => default.clone(),
            _ => self.value.clone(),
        }
    }

    fn target_column(&self) -> String {
        match &self.column {
            Some(column) if !column.is_empty() => column.clone(),
            _ => format!(r#""{}""#, self.key),
        }
    }
}

/// Direction of an `ORDER BY` term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Accepts `asc`/`desc` in any case.
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(QueryError::InvalidSortDirection(value.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Rendered filter clause. Only placeholders, template columns and parsed
/// numbers ever reach the SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    predicates: Vec<String>,
    order_by: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Query {
    /// Conditions joined by `AND`, without the `WHERE` keyword.
    pub fn predicate(&self) -> String {
        self.predicates.join(" AND ")
    }

    /// `ORDER BY` terms, e.g. `created_at DESC`.
    pub fn order_by(&self) -> Option<String> {
        if self.order_by.is_empty() {
            return None;
        }
        let terms: Vec<String> = self
            .order_by
            .iter()
            .map(|(column, direction)| format!("{} {}", column, direction.as_str()))
            .collect();
        Some(terms.join(", "))
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.predicates.is_empty() {
            parts.push(format!("WHERE {}", self.predicate()));
        }
        if let Some(order_by) = self.order_by() {
            parts.push(format!("ORDER BY {}", order_by));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            parts.push(format!("OFFSET {}", offset));
        }
        write!(f, "{}", parts.join(" "))
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<u64, QueryError> {
    raw.trim().parse::<u64>().map_err(|_| QueryError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

/// Build a clause and its positional arguments from `filters`.
///
/// Comparison filters are numbered `$1, $2, ...` in the order they appear;
/// `order`, `limit`, `offset` and raw fragments never take a placeholder.
///
/// # Errors
/// - `InvalidNumber` when a limit/offset is not a non-negative integer
/// - `InvalidSortDirection` when an order value is not `ASC`/`DESC`
/// - `MissingOrderColumn` when an order filter names no column
pub fn build_filter(filters: &[QueryFilter]) -> Result<(Query, Vec<String>), QueryError> {
    let mut query = Query::default();
    let mut args = Vec::new();

    for filter in filters {
        match (&filter.operation, &filter.raw) {
            (Operation::Order, _) => {
                let column = filter
                    .column
                    .as_deref()
                    .filter(|column| !column.is_empty())
                    .ok_or_else(|| QueryError::MissingOrderColumn(filter.key.clone()))?;
                let direction = SortDirection::parse(&filter.bound_value())?;
                query.order_by.push((column.to_string(), direction));
            }
            (Operation::Limit, _) => {
                query.limit = Some(parse_number("limit", &filter.bound_value())?);
            }
            (Operation::Offset, _) => {
                query.offset = Some(parse_number("offset", &filter.bound_value())?);
            }
            (_, Some(fragment)) if !fragment.is_empty() => {
                query.predicates.push(fragment.clone());
            }
            (operation, _) => {
                args.push(filter.bound_value());
                query.predicates.push(format!(
                    "{} {} ${}",
                    filter.target_column(),
                    operation.operator(),
                    args.len()
                ));
            }
        }
    }

    tracing::debug!(clause = %query, args = args.len(), "Built query filter");
    Ok((query, args))
}

/// Fill `filters` from request parameters.
///
/// A parameter value wins over the filter's own value, which wins over its
/// default. Filters that end up with no value are dropped; raw fragments pass
/// through untouched.
///
/// # Errors
/// `MissingParameter` when a key listed in `required` has no parameter
pub fn resolve_filters(
    params: &[(String, String)],
    filters: &[QueryFilter],
    required: &[&str],
) -> Result<Vec<QueryFilter>, QueryError> {
    let mut resolved = Vec::with_capacity(filters.len());

    for filter in filters {
        if filter.raw.is_some() {
            resolved.push(filter.clone());
            continue;
        }

        let param = params
            .iter()
            .find(|(key, _)| key == &filter.key)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty());

        if param.is_none() && required.contains(&filter.key.as_str()) {
            return Err(QueryError::MissingParameter(filter.key.clone()));
        }

        let value = match param {
            Some(value) => value.to_string(),
            None => filter.bound_value(),
        };
        if value.is_empty() {
            continue;
        }

        resolved.push(QueryFilter {
            value,
            default: None,
            ..filter.clone()
        });
    }

    Ok(resolved)
}

/// `resolve_filters` over the query string of an actix request.
pub fn resolve_filters_from_request(
    req: &HttpRequest,
    filters: &[QueryFilter],
    required: &[&str],
) -> Result<Vec<QueryFilter>, QueryError> {
    let params = web::Query::<Vec<(String, String)>>::from_query(req.query_string())
        .map_err(|e| QueryError::InvalidQueryString(e.to_string()))?
        .into_inner();
    resolve_filters(&params, filters, required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_order_and_offset() {
        let (query, args) = build_filter(&[
            QueryFilter::new("status").value("active"),
            QueryFilter::new("order").op("order").column("created_at").value("DESC"),
            QueryFilter::new("page").op("offset").value("1"),
        ])
        .unwrap();

        assert_eq!(
            query.to_string(),
            r#"WHERE "status" = $1 ORDER BY created_at DESC OFFSET 1"#
        );
        assert_eq!(args, vec!["active".to_string()]);
        assert_eq!(query.offset(), Some(1));
        assert_eq!(query.limit(), None);
    }

    #[test]
    fn test_placeholders_follow_first_seen_order() {
        let (query, args) = build_filter(&[
            QueryFilter::new("school_id").value("5"),
            QueryFilter::new("perPage").op("limit").value("10"),
            QueryFilter::new("created_at").op(">=").value("2024-01-01"),
            QueryFilter::new("name").op("ILIKE").column("u.name").value("%ann%"),
        ])
        .unwrap();

        assert_eq!(
            query.predicate(),
            r#""school_id" = $1 AND "created_at" >= $2 AND u.name ILIKE $3"#
        );
        assert_eq!(args, vec!["5", "2024-01-01", "%ann%"]);
        assert_eq!(query.limit(), Some(10));
    }

    #[test]
    fn test_default_used_when_value_empty() {
        let (query, args) =
            build_filter(&[QueryFilter::new("status").default_value("active")]).unwrap();
        assert_eq!(query.predicate(), r#""status" = $1"#);
        assert_eq!(args, vec!["active"]);
    }

    #[test]
    fn test_raw_fragment_takes_no_placeholder() {
        let (query, args) = build_filter(&[
            QueryFilter::raw("deleted_at IS NULL"),
            QueryFilter::new("role_id").value("3"),
        ])
        .unwrap();

        assert_eq!(query.to_string(), r#"WHERE deleted_at IS NULL AND "role_id" = $1"#);
        assert_eq!(args, vec!["3"]);
    }

    #[test]
    fn test_modifiers_only() {
        let (query, args) = build_filter(&[
            QueryFilter::order("order", r#""created_at""#, "DESC"),
            QueryFilter::offset("page", "1"),
            QueryFilter::limit("perPage", "10"),
        ])
        .unwrap();

        assert!(args.is_empty());
        assert_eq!(query.order_by().as_deref(), Some(r#""created_at" DESC"#));
        assert_eq!(query.to_string(), r#"ORDER BY "created_at" DESC LIMIT 10 OFFSET 1"#);
        assert_eq!(query.predicate(), "");
    }

    #[test]
    fn test_non_numeric_limit_is_an_error() {
        let err = build_filter(&[QueryFilter::limit("perPage", "ten")]).unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidNumber {
                field: "limit",
                value: "ten".to_string()
            }
        );
    }

    #[test]
    fn test_negative_offset_is_an_error() {
        let err = build_filter(&[QueryFilter::offset("page", "-1")]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidNumber { field: "offset", .. }));
    }

    #[test]
    fn test_sort_direction_is_normalised() {
        let (query, _) = build_filter(&[QueryFilter::order("sort", "name", " asc ")]).unwrap();
        assert_eq!(query.to_string(), "ORDER BY name ASC");
    }

    #[test]
    fn test_order_requires_column() {
        let err = build_filter(&[QueryFilter::new("sort").op("order").value("DESC")])
            .unwrap_err();
        assert_eq!(err, QueryError::MissingOrderColumn("sort".to_string()));
    }

    #[test]
    fn test_request_text_never_reaches_limit_clause() {
        let req = actix_web::test::TestRequest::with_uri(
            "/users?status=active&perPage=1%3B%20DROP%20TABLE%20users",
        )
        .to_http_request();
        let templates = vec![QueryFilter::new("status"), QueryFilter::limit("perPage", "20")];

        let resolved = resolve_filters_from_request(&req, &templates, &[]).unwrap();
        let err = build_filter(&resolved).unwrap_err();

        assert_eq!(
            err,
            QueryError::InvalidNumber {
                field: "limit",
                value: "1; DROP TABLE users".to_string()
            }
        );
    }

    #[test]
    fn test_request_text_never_reaches_order_clause() {
        let req = actix_web::test::TestRequest::with_uri(
            "/users?sort=DESC%3B%20DROP%20TABLE%20users",
        )
        .to_http_request();
        let templates = vec![QueryFilter::order("sort", "created_at", "ASC")];

        let resolved = resolve_filters_from_request(&req, &templates, &[]).unwrap();
        let err = build_filter(&resolved).unwrap_err();

        assert_eq!(
            err,
            QueryError::InvalidSortDirection("DESC; DROP TABLE users".to_string())
        );
    }

    #[test]
    fn test_empty_filters() {
        let (query, args) = build_filter(&[]).unwrap();
        assert_eq!(query.to_string(), "");
        assert!(args.is_empty());
        assert_eq!(query.order_by(), None);
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_prefers_request_values() {
        let templates = vec![
            QueryFilter::new("status").default_value("active"),
            QueryFilter::new("name"),
            QueryFilter::limit("perPage", "20"),
        ];
        let resolved = resolve_filters(
            &params(&[("status", "archived"), ("perPage", "5")]),
            &templates,
            &[],
        )
        .unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].value, "archived");
        assert_eq!(resolved[1].key, "perPage");
        assert_eq!(resolved[1].value, "5");
    }

    #[test]
    fn test_resolve_falls_back_to_template_then_default() {
        let templates = vec![
            QueryFilter::new("status").default_value("active"),
            QueryFilter::offset("page", "0"),
        ];
        let resolved = resolve_filters(&[], &templates, &[]).unwrap();

        assert_eq!(resolved[0].value, "active");
        assert_eq!(resolved[0].default, None);
        assert_eq!(resolved[1].value, "0");
    }

    #[test]
    fn test_resolve_missing_required() {
        let templates = vec![QueryFilter::new("status"), QueryFilter::new("school_id")];
        let err = resolve_filters(&params(&[("status", "x")]), &templates, &["school_id"])
            .unwrap_err();
        assert_eq!(err, QueryError::MissingParameter("school_id".to_string()));
    }

    #[test]
    fn test_resolve_from_request() {
        let req = actix_web::test::TestRequest::with_uri("/users?status=active&page=2")
            .to_http_request();
        let templates = vec![QueryFilter::new("status"), QueryFilter::offset("page", "")];

        let resolved = resolve_filters_from_request(&req, &templates, &["status"]).unwrap();
        let (query, args) = build_filter(&resolved).unwrap();

        assert_eq!(args, vec!["active"]);
        assert_eq!(query.offset(), Some(2));
    }
}
