//! SQL builders for catalog and aggregate queries.
//!
//! Every builder is a pure function. It returns `None` when any identifier is
//! empty or fails [`SqlSecurity::validate_identifier`], so no statement is ever
//! built from a bad name. Callers turn `None` into
//! [`ExplorerError::MalformedQuery`](crate::error::ExplorerError::MalformedQuery).
//!
//! Schema, table and column names are double-quoted in data queries, so a
//! name is matched exactly as the catalog reports it: `Salary` is not folded
//! to `salary`, and a column named `user` is not read as `current_user`.
//! Catalog queries compare names as string literals, which never fold.

use chrono::NaiveDate;

use crate::analyzers::classifier::ColumnFamily;
use crate::security::SqlSecurity;

/// POSIX character classes used by the text profiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharClass {
    Space,
    Lower,
    Upper,
    Alpha,
    Digit,
}

impl CharClass {
    pub const ALL: [CharClass; 5] = [
        CharClass::Space,
        CharClass::Lower,
        CharClass::Upper,
        CharClass::Alpha,
        CharClass::Digit,
    ];

    /// Name of the class inside a bracket expression.
    pub fn posix_name(&self) -> &'static str {
        match self {
            CharClass::Space => "space",
            CharClass::Lower => "lower",
            CharClass::Upper => "upper",
            CharClass::Alpha => "alpha",
            CharClass::Digit => "digit",
        }
    }

    /// Whether every character of `s` belongs to the class.
    pub fn matches(&self, s: &str) -> bool {
        s.chars().all(|c| match self {
            CharClass::Space => c.is_whitespace(),
            CharClass::Lower => c.is_lowercase(),
            CharClass::Upper => c.is_uppercase(),
            CharClass::Alpha => c.is_alphabetic(),
            CharClass::Digit => c.is_ascii_digit(),
        })
    }
}

/// A validated name, for use inside a string literal.
fn literal_name(name: &str) -> Option<&str> {
    SqlSecurity::is_valid_identifier(name).then_some(name)
}

/// A validated, double-quoted identifier. Valid names never contain `"`.
fn ident(name: &str) -> Option<String> {
    SqlSecurity::is_valid_identifier(name).then(|| format!("\"{name}\""))
}

fn qualified(schema: &str, table: &str) -> Option<String> {
    Some(format!("{}.{}", ident(schema)?, ident(table)?))
}

/// Lists every table visible in the catalog.
pub fn tables_list_query() -> String {
    "select table_schema, table_name from information_schema.tables order by table_schema, table_name"
        .to_string()
}

/// Fetches the full content of a table.
pub fn table_data_query(schema: &str, table: &str) -> Option<String> {
    Some(format!("select * from {}", qualified(schema, table)?))
}

/// Describes the columns of a table, flagging columns that take part in a constraint.
pub fn table_schema_query(schema: &str, table: &str) -> Option<String> {
    let schema = literal_name(schema)?;
    let table = literal_name(table)?;
    Some(format!(
        "select c.table_name, c.column_name, c.data_type, \
         case when exists(select 1 from information_schema.constraint_column_usage k \
         where c.table_name = k.table_name and k.column_name = c.column_name) \
         then true else false end as primary_key, \
         c.is_nullable, c.character_maximum_length, c.numeric_precision \
         from information_schema.columns c \
         where c.table_schema = '{schema}' and c.table_name = '{table}' \
         order by c.ordinal_position"
    ))
}

/// Names of the columns of a table whose declared type belongs to `family`.
pub fn family_columns_query(family: ColumnFamily, schema: &str, table: &str) -> Option<String> {
    let schema = literal_name(schema)?;
    let table = literal_name(table)?;
    let types = family
        .declared_types()
        .iter()
        .map(|t| format!("'{t}'"))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "select column_name from information_schema.columns \
         where table_schema = '{schema}' and table_name = '{table}' and data_type in ({types})"
    ))
}

/// Fetches one column of a table.
pub fn column_query(schema: &str, table: &str, column: &str) -> Option<String> {
    let from = qualified(schema, table)?;
    Some(format!("select {} from {from}", ident(column)?))
}

pub fn unique_query(schema: &str, table: &str, column: &str) -> Option<String> {
    let from = qualified(schema, table)?;
    Some(format!("select count(distinct {}) from {from}", ident(column)?))
}

/// Sample standard deviation, computed by the database.
pub fn std_query(schema: &str, table: &str, column: &str) -> Option<String> {
    let from = qualified(schema, table)?;
    Some(format!("select stddev({}) from {from}", ident(column)?))
}

pub fn negative_query(schema: &str, table: &str, column: &str) -> Option<String> {
    let from = qualified(schema, table)?;
    let col = ident(column)?;
    Some(format!("select count({col}) from {from} where {col} < 0"))
}

pub fn mode_query(schema: &str, table: &str, column: &str) -> Option<String> {
    let from = qualified(schema, table)?;
    Some(format!(
        "select mode() within group (order by {}) from {from}",
        ident(column)?
    ))
}

/// Counts values made up entirely of characters from `class`.
pub fn char_class_query(
    class: CharClass,
    schema: &str,
    table: &str,
    column: &str,
) -> Option<String> {
    let from = qualified(schema, table)?;
    let col = ident(column)?;
    Some(format!(
        "select count({col}) from {from} where {col} ~ '^[[:{}:]]*$'",
        class.posix_name()
    ))
}

pub fn min_query(schema: &str, table: &str, column: &str) -> Option<String> {
    let from = qualified(schema, table)?;
    Some(format!("select min({}) from {from}", ident(column)?))
}

pub fn max_query(schema: &str, table: &str, column: &str) -> Option<String> {
    let from = qualified(schema, table)?;
    Some(format!("select max({}) from {from}", ident(column)?))
}

/// Saturdays and Sundays (ISO day of week 6 and 7).
pub fn weekend_query(schema: &str, table: &str, column: &str) -> Option<String> {
    let from = qualified(schema, table)?;
    let col = ident(column)?;
    Some(format!(
        "select count({col}) from {from} where extract(isodow from {col}) in (6, 7)"
    ))
}

pub fn weekday_query(schema: &str, table: &str, column: &str) -> Option<String> {
    let from = qualified(schema, table)?;
    let col = ident(column)?;
    Some(format!(
        "select count({col}) from {from} where extract(isodow from {col}) in (1, 2, 3, 4, 5)"
    ))
}

/// Values strictly after the database's current date at execution time.
pub fn future_query(schema: &str, table: &str, column: &str) -> Option<String> {
    let from = qualified(schema, table)?;
    let col = ident(column)?;
    Some(format!(
        "select count({col}) from {from} where {col} > current_date"
    ))
}

/// Exact matches against a placeholder date such as 1900-01-01.
pub fn sentinel_date_query(
    date: NaiveDate,
    schema: &str,
    table: &str,
    column: &str,
) -> Option<String> {
    let from = qualified(schema, table)?;
    let col = ident(column)?;
    Some(format!(
        "select count({col}) from {from} where {col} = '{}'",
        date.format("%Y-%m-%d")
    ))
}
