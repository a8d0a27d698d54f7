//! Partitioning of a table's columns into numeric, text and datetime families.
//!
//! The family of a column is decided by its declared SQL type as reported by
//! `information_schema.columns`. Columns whose type is in none of the lists
//! (booleans, arrays, json, ...) belong to no family.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::queries;
use crate::sources::Session;

/// A column family, determined by declared SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnFamily {
    Numeric,
    Text,
    Datetime,
}

impl ColumnFamily {
    pub const ALL: [ColumnFamily; 3] = [
        ColumnFamily::Numeric,
        ColumnFamily::Text,
        ColumnFamily::Datetime,
    ];

    /// Declared type names (as in `information_schema.columns.data_type`)
    /// that belong to the family.
    pub fn declared_types(&self) -> &'static [&'static str] {
        match self {
            ColumnFamily::Numeric => &[
                "smallint",
                "integer",
                "bigint",
                "decimal",
                "numeric",
                "real",
                "double precision",
                "smallserial",
                "serial",
                "bigserial",
                "money",
            ],
            ColumnFamily::Text => &[
                "character varying",
                "character",
                "text",
                "char",
                "name",
                "bytea",
            ],
            ColumnFamily::Datetime => &[
                "timestamp without time zone",
                "timestamp with time zone",
                "time without time zone",
                "time with time zone",
                "interval",
                "date",
            ],
        }
    }

    /// Family of a declared type name, if any.
    pub fn of_declared_type(data_type: &str) -> Option<Self> {
        let data_type = data_type.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|family| family.declared_types().contains(&data_type.as_str()))
    }
}

impl fmt::Display for ColumnFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnFamily::Numeric => write!(f, "numeric"),
            ColumnFamily::Text => write!(f, "text"),
            ColumnFamily::Datetime => write!(f, "datetime"),
        }
    }
}

/// Column names of one table grouped by family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnFamilies {
    pub numeric: BTreeSet<String>,
    pub text: BTreeSet<String>,
    pub datetime: BTreeSet<String>,
}

impl ColumnFamilies {
    pub fn get(&self, family: ColumnFamily) -> &BTreeSet<String> {
        match family {
            ColumnFamily::Numeric => &self.numeric,
            ColumnFamily::Text => &self.text,
            ColumnFamily::Datetime => &self.datetime,
        }
    }

    fn get_mut(&mut self, family: ColumnFamily) -> &mut BTreeSet<String> {
        match family {
            ColumnFamily::Numeric => &mut self.numeric,
            ColumnFamily::Text => &mut self.text,
            ColumnFamily::Datetime => &mut self.datetime,
        }
    }

    /// Family of a column, if it was classified into one.
    pub fn family_of(&self, column: &str) -> Option<ColumnFamily> {
        ColumnFamily::ALL
            .into_iter()
            .find(|family| self.get(*family).contains(column))
    }
}

/// Runs one catalog query per family and collects the returned column names.
#[instrument(skip(session))]
pub async fn classify(session: &mut Session, schema: &str, table: &str) -> Result<ColumnFamilies> {
    let mut families = ColumnFamilies::default();
    for family in ColumnFamily::ALL {
        let sql = queries::family_columns_query(family, schema, table);
        let result = session.run(&format!("{family} columns"), sql).await?;
        let columns = families.get_mut(family);
        for value in result.column_values(0) {
            if !value.is_null() {
                columns.insert(value.to_string());
            }
        }
        debug!(%family, count = columns.len(), "Classified columns");
    }
    Ok(families)
}
