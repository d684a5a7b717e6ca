//! Helpers for assembling parameterized SQL for list filters, ordering and partial updates.

use serde::{de, Deserialize, Deserializer};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::{Arguments, Encode, Type};

use crate::error::AppError;

/// Collects bind values alongside the `$n` placeholders that reference them.
///
/// The SQL text and the arguments are built together so placeholder numbers can
/// never drift out of sync with the values bound to them.
#[derive(Default)]
pub struct Binder {
    args: PgArguments,
    count: usize,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the argument list and returns its placeholder.
    pub fn push<T>(&mut self, value: T) -> String
    where
        T: for<'q> Encode<'q, Postgres> + Type<Postgres> + Send + 'static,
    {
        self.args.add(value);
        self.count += 1;
        format!("${}", self.count)
    }

    /// Number of values bound so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn into_arguments(self) -> PgArguments {
        self.args
    }
}

/// Joins filter conditions into a ` WHERE ...` clause, or nothing when there are none.
pub fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

/// Wraps a search term for a case-insensitive substring match with `ILIKE`.
///
/// `%`, `_` and `\` in the term are escaped so they match literally.
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// A field a registry allows clients to sort by.
pub trait OrderingField: Sized + Copy {
    /// Parses the client-facing field name.
    fn parse(name: &str) -> Option<Self>;
    /// Qualified SQL column for the field.
    fn column(self) -> &'static str;
}

/// Parses a comma separated ordering expression such as `-priority,due_date`.
///
/// Returns the `ORDER BY` body, always ending in `tie_breaker` so results are
/// stable. An empty or missing expression yields `default`.
pub fn order_by<F: OrderingField>(
    ordering: Option<&str>,
    default: &[(F, bool)],
    tie_breaker: &str,
) -> Result<String, AppError> {
    let mut terms: Vec<(F, bool)> = Vec::new();

    for raw in ordering.unwrap_or("").split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let (name, descending) = match raw.strip_prefix('-') {
            Some(name) => (name, true),
            None => (raw, false),
        };
        let field = F::parse(name).ok_or_else(|| {
            AppError::ValidationError(format!("Cannot order by unknown field '{}'", name))
        })?;
        terms.push((field, descending));
    }

    if terms.is_empty() {
        terms.extend_from_slice(default);
    }

    let mut parts: Vec<String> = terms
        .into_iter()
        .map(|(field, descending)| {
            format!("{} {}", field.column(), if descending { "DESC" } else { "ASC" })
        })
        .collect();
    parts.push(format!("{} ASC", tie_breaker));

    Ok(parts.join(", "))
}

/// Distinguishes an explicit `null` from an absent field in partial updates.
///
/// Use with `#[serde(default, deserialize_with = "deserialize_some")]` on an
/// `Option<Option<T>>`: absent stays `None`, `null` becomes `Some(None)`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Rejects an explicit `null` on a field that cannot be cleared.
///
/// Use with `#[serde(default, deserialize_with = "deserialize_non_null")]` on an
/// `Option<T>`: absent stays `None`, `null` is a deserialization error.
pub fn deserialize_non_null<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    match Option::<T>::deserialize(deserializer)? {
        Some(value) => Ok(Some(value)),
        None => Err(de::Error::custom("this field may not be null")),
    }
}
