//! Whole-table profile.
//!
//! A [`TableProfile`] materializes every row of one table and derives the
//! table-level scalars (dimensions, duplicated rows, missing cells) together
//! with the column classification. Loading an empty table is not an error: the
//! profile moves to [`TableState::Empty`] and nothing else is computed.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::analyzers::classifier::{classify, ColumnFamilies};
use crate::analyzers::numeric::coerce_numeric;
use crate::analyzers::types::Summary;
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::formatters::format_count;
use crate::queries;
use crate::sources::Session;
use crate::types::{Row, TableHandle, Value};

/// Row count used by [`TableProfile::preview`] when no configuration applies.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Where a table profile is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TableState {
    NotLoaded,
    /// The table has no rows
    Empty,
    Loaded,
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableState::NotLoaded => "NotLoaded",
            TableState::Empty => "Empty",
            TableState::Loaded => "Loaded",
        };
        write!(f, "{name}")
    }
}

/// One column as described by the database catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    /// Best-effort flag: the column appears in a constraint of a table with
    /// the same name
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub character_maximum_length: Option<i64>,
    pub numeric_precision: Option<i64>,
}

/// Materialized rows of one table and the scalars derived from them.
#[derive(Debug, Clone)]
pub struct TableProfile {
    handle: TableHandle,
    state: TableState,
    columns: Vec<String>,
    content: Vec<Row>,
    preview_rows: usize,
    row_count: Option<usize>,
    column_count: Option<usize>,
    duplicate_row_count: Option<u64>,
    missing_cell_count: Option<u64>,
    families: Option<ColumnFamilies>,
}

impl TableProfile {
    pub fn new(handle: TableHandle) -> Self {
        Self {
            handle,
            state: TableState::NotLoaded,
            columns: Vec::new(),
            content: Vec::new(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            row_count: None,
            column_count: None,
            duplicate_row_count: None,
            missing_cell_count: None,
            families: None,
        }
    }

    pub fn handle(&self) -> &TableHandle {
        &self.handle
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    /// True when the last load found no rows.
    pub fn is_empty(&self) -> bool {
        self.state == TableState::Empty
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn content(&self) -> &[Row] {
        &self.content
    }

    pub fn row_count(&self) -> Option<usize> {
        self.row_count
    }

    pub fn column_count(&self) -> Option<usize> {
        self.column_count
    }

    /// Rows equal to an earlier row across every column. NULLs compare equal.
    pub fn duplicate_row_count(&self) -> Option<u64> {
        self.duplicate_row_count
    }

    /// Number of missing cells over the whole table.
    pub fn missing_cell_count(&self) -> Option<u64> {
        self.missing_cell_count
    }

    /// Column classification; `None` until a non-empty load.
    pub fn families(&self) -> Option<&ColumnFamilies> {
        self.families.as_ref()
    }

    pub fn numeric_columns(&self) -> Option<&BTreeSet<String>> {
        self.families.as_ref().map(|f| &f.numeric)
    }

    pub fn text_columns(&self) -> Option<&BTreeSet<String>> {
        self.families.as_ref().map(|f| &f.text)
    }

    pub fn datetime_columns(&self) -> Option<&BTreeSet<String>> {
        self.families.as_ref().map(|f| &f.datetime)
    }

    /// Fetches every row and derives the table scalars.
    ///
    /// Numeric columns are coerced in place after classification; a value
    /// that cannot be read as a number fails the load. Nothing is committed
    /// unless every step succeeds.
    #[instrument(skip(self, session, config), fields(table = %self.handle))]
    pub async fn load(&mut self, session: &mut Session, config: &ExplorerConfig) -> Result<TableState> {
        let (schema, table) = (
            self.handle.schema_name.as_str(),
            self.handle.table_name.as_str(),
        );
        let result = session
            .run("table data", queries::table_data_query(schema, table))
            .await?;
        let columns = result.columns;
        let mut content = result.rows;

        if content.is_empty() {
            info!("Table has no rows");
            *self = Self::new(self.handle.clone());
            self.columns = columns;
            self.preview_rows = config.preview_rows;
            self.state = TableState::Empty;
            return Ok(self.state);
        }

        let row_count = content.len();
        let column_count = columns.len();
        let missing_cell_count = missing_cells(&content);
        let families = classify(session, schema, table).await?;

        for name in &families.numeric {
            let Some(idx) = columns.iter().position(|c| c == name) else {
                debug!(column = %name, "Classified column not in table data");
                continue;
            };
            let raw: Vec<Value> = content
                .iter_mut()
                .map(|row| std::mem::replace(&mut row[idx], Value::Null))
                .collect();
            let coerced = coerce_numeric(name, raw)?;
            for (row, value) in content.iter_mut().zip(coerced) {
                row[idx] = value;
            }
        }
        // numbers compare by value: NUMERIC text "1.0" and "1.00" are one row
        let duplicate_row_count = duplicate_rows(&content);

        info!(
            rows = row_count,
            columns = column_count,
            duplicates = duplicate_row_count,
            missing = missing_cell_count,
            "Loaded table"
        );
        self.columns = columns;
        self.content = content;
        self.preview_rows = config.preview_rows;
        self.row_count = Some(row_count);
        self.column_count = Some(column_count);
        self.duplicate_row_count = Some(duplicate_row_count);
        self.missing_cell_count = Some(missing_cell_count);
        self.families = Some(families);
        self.state = TableState::Loaded;
        Ok(self.state)
    }

    /// First `n` rows, or all of them when the table is shorter.
    pub fn head(&self, n: usize) -> &[Row] {
        &self.content[..n.min(self.content.len())]
    }

    /// Last `n` rows, or all of them when the table is shorter.
    pub fn tail(&self, n: usize) -> &[Row] {
        let len = self.content.len();
        &self.content[len - n.min(len)..]
    }

    /// The configured number of leading rows.
    pub fn preview(&self) -> &[Row] {
        self.head(self.preview_rows)
    }

    /// `n` distinct rows drawn uniformly at random.
    pub fn sample(&self, n: usize) -> Result<Vec<&Row>> {
        self.sample_with_rng(n, &mut rand::rng())
    }

    /// Like [`sample`](Self::sample), drawing from `rng`.
    pub fn sample_with_rng<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<&Row>> {
        let available = self.content.len();
        if n > available {
            return Err(ExplorerError::SampleTooLarge {
                requested: n,
                available,
            });
        }
        Ok(rand::seq::index::sample(rng, available, n)
            .into_iter()
            .map(|i| &self.content[i])
            .collect())
    }

    /// Row `index` keyed by column name.
    pub fn row(&self, index: usize) -> Option<BTreeMap<&str, &Value>> {
        let row = self.content.get(index)?;
        Some(
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect(),
        )
    }

    /// Table-level overview. The last entry counts missing cells, not rows.
    pub fn summary(&self) -> Result<Summary> {
        let (Some(rows), Some(columns), Some(duplicates), Some(missing)) = (
            self.row_count,
            self.column_count,
            self.duplicate_row_count,
            self.missing_cell_count,
        ) else {
            return Err(ExplorerError::stats_unavailable(
                self.handle.to_string(),
                self.state,
            ));
        };
        Ok(Summary::new()
            .with("Name of Table", self.handle.table_name.clone())
            .with("Number of Rows", format_count(rows as u64))
            .with("Number of Columns", format_count(columns as u64))
            .with("Number of Duplicated Rows", format_count(duplicates))
            .with("Number of Rows with Missing Values", format_count(missing)))
    }

    /// Catalog description of the table's columns.
    pub async fn schema(&self, session: &mut Session) -> Result<Vec<ColumnDescriptor>> {
        describe_table(session, &self.handle).await
    }
}

/// Counts rows that repeat an earlier row.
pub fn duplicate_rows(rows: &[Row]) -> u64 {
    let mut seen: HashSet<&[Value]> = HashSet::with_capacity(rows.len());
    rows.iter().filter(|row| !seen.insert(row.as_slice())).count() as u64
}

/// Counts missing cells across every row.
pub fn missing_cells(rows: &[Row]) -> u64 {
    rows.iter()
        .flat_map(|row| row.iter())
        .filter(|v| v.is_missing())
        .count() as u64
}

/// Reads the column catalog for one table, in ordinal order.
#[instrument(skip(session), fields(table = %handle))]
pub async fn describe_table(session: &mut Session, handle: &TableHandle) -> Result<Vec<ColumnDescriptor>> {
    let sql = queries::table_schema_query(&handle.schema_name, &handle.table_name);
    let result = session.run("table schema", sql).await?;
    if result.num_columns() != 7 {
        return Err(ExplorerError::invalid_data(format!(
            "table schema query returned {} columns, expected 7",
            result.num_columns()
        )));
    }
    result.rows.iter().map(|row| descriptor(row)).collect()
}

fn descriptor(row: &[Value]) -> Result<ColumnDescriptor> {
    Ok(ColumnDescriptor {
        table_name: text(&row[0]),
        column_name: text(&row[1]),
        data_type: text(&row[2]),
        is_primary_key: flag(&row[3])?,
        is_nullable: flag(&row[4])?,
        character_maximum_length: row[5].as_i64(),
        numeric_precision: row[6].as_i64(),
    })
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        v => v.to_string(),
    }
}

/// Reads a boolean or a catalog `YES`/`NO` flag.
fn flag(value: &Value) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Integer(i) => Ok(*i != 0),
        Value::Text(s) => match s.to_ascii_lowercase().as_str() {
            "yes" | "true" | "t" => Ok(true),
            "no" | "false" | "f" => Ok(false),
            _ => Err(ExplorerError::invalid_data(format!("expected a flag, got '{s}'"))),
        },
        Value::Null => Ok(false),
        v => Err(ExplorerError::invalid_data(format!("expected a flag, got {v}"))),
    }
}
