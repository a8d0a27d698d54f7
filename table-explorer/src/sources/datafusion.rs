//! In-process [`TableSource`] backed by a DataFusion [`SessionContext`].
//!
//! Tables registered on the context (for example with `register_batch`) are
//! queried with the same SQL the engine sends to PostgreSQL. To make the
//! catalog queries work, every [`open`](TableSource::open) rebuilds an
//! `information_schema` schema in the default catalog with PostgreSQL-shaped
//! `tables`, `columns` and `constraint_column_usage` tables.
//!
//! DataFusion does not implement every PostgreSQL construct the profilers use
//! (`mode() within group`, `extract(isodow ...)`, `exists` inside a
//! projection). Those statistics need a PostgreSQL source.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::record_batch::RecordBatch;
use arrow::datatypes::{
    DataType, Date32Type, Field, Float64Type, Int64Type, Schema, Time64MicrosecondType, TimeUnit,
    TimestampMicrosecondType, UInt64Type,
};
use async_trait::async_trait;
use chrono::DateTime;
use datafusion::catalog::{CatalogProvider, MemorySchemaProvider, SchemaProvider};
use datafusion::datasource::{MemTable, TableProvider};
use datafusion::execution::context::SQLOptions;
use datafusion::logical_expr::TableType;
use datafusion::prelude::SessionContext;
use futures::TryStreamExt;
use tracing::{debug, instrument};

use super::{SourceSession, TableSource};
use crate::error::{ErrorContext, ExplorerError, Result};
use crate::types::{QueryResult, Row, Value};

const INFORMATION_SCHEMA: &str = "information_schema";

/// Column metadata reported through `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DeclaredType {
    data_type: String,
    character_maximum_length: Option<i64>,
    numeric_precision: Option<i64>,
}

impl DeclaredType {
    /// Parses a PostgreSQL type declaration such as `varchar(50)` or `numeric(10, 2)`.
    fn parse(declaration: &str) -> Self {
        let declaration = declaration.trim().to_lowercase();
        let (base, first_arg) = match declaration.split_once('(') {
            Some((base, args)) => {
                let first = args
                    .trim_end_matches(')')
                    .split(',')
                    .next()
                    .and_then(|a| a.trim().parse::<i64>().ok());
                (base.trim().to_string(), first)
            }
            None => (declaration.clone(), None),
        };

        let data_type = match base.as_str() {
            "varchar" => "character varying",
            "char" | "bpchar" => "character",
            "int2" => "smallint",
            "int" | "int4" => "integer",
            "int8" => "bigint",
            "float4" => "real",
            "float8" => "double precision",
            "decimal" => "numeric",
            "bool" => "boolean",
            "timestamp" => "timestamp without time zone",
            "timestamptz" => "timestamp with time zone",
            "time" => "time without time zone",
            "timetz" => "time with time zone",
            other => other,
        }
        .to_string();

        let is_character = matches!(data_type.as_str(), "character varying" | "character");
        Self {
            character_maximum_length: if is_character { first_arg } else { None },
            numeric_precision: if is_character { None } else { first_arg },
            data_type,
        }
    }

    /// PostgreSQL name of an Arrow type, with its binary precision for numbers.
    fn from_arrow(data_type: &DataType) -> Self {
        let (name, precision) = match data_type {
            DataType::Int8 | DataType::UInt8 | DataType::Int16 => ("smallint", Some(16)),
            DataType::UInt16 | DataType::Int32 => ("integer", Some(32)),
            DataType::UInt32 | DataType::Int64 => ("bigint", Some(64)),
            DataType::UInt64 => ("numeric", Some(20)),
            DataType::Float16 | DataType::Float32 => ("real", Some(24)),
            DataType::Float64 => ("double precision", Some(53)),
            DataType::Decimal128(p, _) | DataType::Decimal256(p, _) => {
                ("numeric", Some(i64::from(*p)))
            }
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ("text", None),
            DataType::Boolean => ("boolean", None),
            DataType::Date32 | DataType::Date64 => ("date", None),
            DataType::Timestamp(_, None) => ("timestamp without time zone", None),
            DataType::Timestamp(_, Some(_)) => ("timestamp with time zone", None),
            DataType::Time32(_) | DataType::Time64(_) => ("time without time zone", None),
            DataType::Interval(_) | DataType::Duration(_) => ("interval", None),
            DataType::Binary
            | DataType::LargeBinary
            | DataType::BinaryView
            | DataType::FixedSizeBinary(_) => ("bytea", None),
            DataType::List(_) | DataType::LargeList(_) | DataType::FixedSizeList(_, _) => {
                ("ARRAY", None)
            }
            _ => ("USER-DEFINED", None),
        };
        Self {
            data_type: name.to_string(),
            character_maximum_length: None,
            numeric_precision: precision,
        }
    }
}

type ColumnKey = (String, String, String);

/// A [`TableSource`] over the tables registered in a DataFusion context.
///
/// # Examples
///
/// ```rust
/// use table_explorer::sources::DataFusionSource;
/// use datafusion::prelude::SessionContext;
///
/// let source = DataFusionSource::new(SessionContext::new())
///     .with_primary_key("public", "employees", "employee_id")
///     .with_declared_type("public", "employees", "last_name", "varchar(50)");
/// ```
#[derive(Clone)]
pub struct DataFusionSource {
    ctx: SessionContext,
    primary_keys: Vec<ColumnKey>,
    declared_types: HashMap<ColumnKey, DeclaredType>,
}

impl std::fmt::Debug for DataFusionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFusionSource")
            .field("session_id", &self.ctx.session_id())
            .field("primary_keys", &self.primary_keys)
            .field("declared_types", &self.declared_types.len())
            .finish()
    }
}

impl DataFusionSource {
    /// Wraps a context. The context must have its built-in information schema disabled.
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            primary_keys: Vec::new(),
            declared_types: HashMap::new(),
        }
    }

    /// The wrapped context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Reports `column` in `information_schema.constraint_column_usage`.
    pub fn with_primary_key(
        mut self,
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.primary_keys
            .push((schema.into(), table.into(), column.into()));
        self
    }

    /// Overrides the type reported for `column`, e.g. `"varchar(50)"`.
    pub fn with_declared_type(
        mut self,
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        declaration: &str,
    ) -> Self {
        self.declared_types.insert(
            (schema.into(), table.into(), column.into()),
            DeclaredType::parse(declaration),
        );
        self
    }

    #[instrument(skip(self))]
    async fn refresh_catalog(&self) -> Result<()> {
        let config = self.ctx.copied_config();
        if config.information_schema() {
            return Err(ExplorerError::Configuration(
                "DataFusionSource provides its own information_schema; disable the built-in one"
                    .to_string(),
            ));
        }
        let catalog_name = config.options().catalog.default_catalog.clone();
        let catalog = self.ctx.catalog(&catalog_name).ok_or_else(|| {
            ExplorerError::connection("DataFusion", format!("catalog '{catalog_name}' not found"))
        })?;

        let mut tables = CatalogTables::default();
        let mut schema_names = catalog.schema_names();
        schema_names.sort();
        for schema_name in schema_names {
            if schema_name == INFORMATION_SCHEMA {
                continue;
            }
            let Some(schema) = catalog.schema(&schema_name) else {
                continue;
            };
            let mut table_names = schema.table_names();
            table_names.sort();
            for table_name in table_names {
                let Some(provider) = schema.table(&table_name).await? else {
                    continue;
                };
                tables.add_table(&schema_name, &table_name, provider.table_type());
                for (idx, field) in provider.schema().fields().iter().enumerate() {
                    let key = (schema_name.clone(), table_name.clone(), field.name().clone());
                    let declared = self
                        .declared_types
                        .get(&key)
                        .cloned()
                        .unwrap_or_else(|| DeclaredType::from_arrow(field.data_type()));
                    tables.add_column(&key, idx + 1, field.is_nullable(), &declared);
                }
            }
        }
        for view in ["columns", "constraint_column_usage", "tables"] {
            tables.add_table(INFORMATION_SCHEMA, view, TableType::View);
        }
        for key in &self.primary_keys {
            tables.add_constraint(key);
        }

        let provider = MemorySchemaProvider::new();
        let batches = tables
            .into_batches()
            .context("building information_schema tables")?;
        for (name, batch) in batches {
            let table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
            provider.register_table(name.to_string(), Arc::new(table))?;
        }
        catalog.register_schema(INFORMATION_SCHEMA, Arc::new(provider))?;
        debug!(catalog = %catalog_name, "Rebuilt information_schema");
        Ok(())
    }
}

#[async_trait]
impl TableSource for DataFusionSource {
    async fn open(&self) -> Result<Box<dyn SourceSession>> {
        self.refresh_catalog().await.map_err(|e| match e {
            e @ ExplorerError::Configuration(_) => e,
            e => ExplorerError::connection_with_source(
                "DataFusion",
                "failed to prepare catalog",
                Box::new(e),
            ),
        })?;
        Ok(Box::new(DataFusionSession {
            ctx: self.ctx.clone(),
        }))
    }

    fn description(&self) -> String {
        format!("DataFusion session {}", self.ctx.session_id())
    }
}

/// Rows of the emulated catalog tables.
#[derive(Default)]
struct CatalogTables {
    table_schema: Vec<String>,
    table_name: Vec<String>,
    table_type: Vec<String>,
    col_schema: Vec<String>,
    col_table: Vec<String>,
    col_name: Vec<String>,
    col_position: Vec<i64>,
    col_nullable: Vec<String>,
    col_type: Vec<String>,
    col_char_length: Vec<Option<i64>>,
    col_precision: Vec<Option<i64>>,
    key_schema: Vec<String>,
    key_table: Vec<String>,
    key_column: Vec<String>,
}

impl CatalogTables {
    fn add_table(&mut self, schema: &str, table: &str, table_type: TableType) {
        self.table_schema.push(schema.to_string());
        self.table_name.push(table.to_string());
        self.table_type.push(
            match table_type {
                TableType::Base => "BASE TABLE",
                TableType::View => "VIEW",
                TableType::Temporary => "LOCAL TEMPORARY",
            }
            .to_string(),
        );
    }

    fn add_column(&mut self, key: &ColumnKey, position: usize, nullable: bool, declared: &DeclaredType) {
        self.col_schema.push(key.0.clone());
        self.col_table.push(key.1.clone());
        self.col_name.push(key.2.clone());
        self.col_position.push(position as i64);
        self.col_nullable
            .push(if nullable { "YES" } else { "NO" }.to_string());
        self.col_type.push(declared.data_type.clone());
        self.col_char_length.push(declared.character_maximum_length);
        self.col_precision.push(declared.numeric_precision);
    }

    fn add_constraint(&mut self, key: &ColumnKey) {
        self.key_schema.push(key.0.clone());
        self.key_table.push(key.1.clone());
        self.key_column.push(key.2.clone());
    }

    fn into_batches(self) -> Result<Vec<(&'static str, RecordBatch)>> {
        fn text(name: &str) -> Field {
            Field::new(name, DataType::Utf8, false)
        }
        fn strings(values: Vec<String>) -> ArrayRef {
            Arc::new(StringArray::from(values))
        }

        let catalog_names = |n: usize| strings(vec!["datafusion".to_string(); n]);

        let tables = RecordBatch::try_new(
            Arc::new(Schema::new(vec![
                text("table_catalog"),
                text("table_schema"),
                text("table_name"),
                text("table_type"),
            ])),
            vec![
                catalog_names(self.table_name.len()),
                strings(self.table_schema),
                strings(self.table_name),
                strings(self.table_type),
            ],
        )?;

        let columns = RecordBatch::try_new(
            Arc::new(Schema::new(vec![
                text("table_catalog"),
                text("table_schema"),
                text("table_name"),
                text("column_name"),
                Field::new("ordinal_position", DataType::Int64, false),
                text("is_nullable"),
                text("data_type"),
                Field::new("character_maximum_length", DataType::Int64, true),
                Field::new("numeric_precision", DataType::Int64, true),
            ])),
            vec![
                catalog_names(self.col_name.len()),
                strings(self.col_schema),
                strings(self.col_table),
                strings(self.col_name),
                Arc::new(Int64Array::from(self.col_position)),
                strings(self.col_nullable),
                strings(self.col_type),
                Arc::new(Int64Array::from(self.col_char_length)),
                Arc::new(Int64Array::from(self.col_precision)),
            ],
        )?;

        let constraint_names = self
            .key_table
            .iter()
            .map(|t| format!("{t}_pkey"))
            .collect::<Vec<_>>();
        let constraints = RecordBatch::try_new(
            Arc::new(Schema::new(vec![
                text("table_catalog"),
                text("table_schema"),
                text("table_name"),
                text("column_name"),
                text("constraint_name"),
            ])),
            vec![
                catalog_names(self.key_column.len()),
                strings(self.key_schema),
                strings(self.key_table),
                strings(self.key_column),
                strings(constraint_names),
            ],
        )?;

        Ok(vec![
            ("tables", tables),
            ("columns", columns),
            ("constraint_column_usage", constraints),
        ])
    }
}

struct DataFusionSession {
    ctx: SessionContext,
}

#[async_trait]
impl SourceSession for DataFusionSession {
    async fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        let options = SQLOptions::new()
            .with_allow_ddl(false)
            .with_allow_dml(false);
        let query_error =
            |e: datafusion::error::DataFusionError| ExplorerError::query_with_source(sql, e.to_string(), Box::new(e));

        let df = self
            .ctx
            .sql_with_options(sql, options)
            .await
            .map_err(query_error)?;
        let columns = df
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();

        let mut stream = df.execute_stream().await.map_err(query_error)?;
        let mut rows = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(query_error)? {
            append_rows(&batch, &mut rows)?;
        }
        Ok(QueryResult::new(columns, rows))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

fn append_rows(batch: &RecordBatch, rows: &mut Vec<Row>) -> Result<()> {
    let mut columns = batch
        .columns()
        .iter()
        .map(|c| array_values(c.as_ref()).map(Vec::into_iter))
        .collect::<Result<Vec<_>>>()?;
    rows.reserve(batch.num_rows());
    for _ in 0..batch.num_rows() {
        rows.push(
            columns
                .iter_mut()
                .map(|c| c.next().unwrap_or(Value::Null))
                .collect(),
        );
    }
    Ok(())
}

fn collect_values<F>(array: &dyn Array, f: F) -> Result<Vec<Value>>
where
    F: Fn(usize) -> Option<Value>,
{
    (0..array.len())
        .map(|i| {
            if array.is_null(i) {
                Ok(Value::Null)
            } else {
                f(i).ok_or_else(|| {
                    ExplorerError::invalid_data(format!(
                        "value at row {i} of type {} is out of range",
                        array.data_type()
                    ))
                })
            }
        })
        .collect()
}

/// Converts an Arrow array into cell values, normalizing through `cast` first.
fn array_values(array: &dyn Array) -> Result<Vec<Value>> {
    match array.data_type() {
        DataType::Null => Ok(vec![Value::Null; array.len()]),
        DataType::Boolean => {
            let values = array.as_boolean();
            collect_values(array, |i| Some(Value::Boolean(values.value(i))))
        }
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let casted = cast(array, &DataType::Int64)?;
            let values = casted.as_primitive::<Int64Type>();
            collect_values(array, |i| Some(Value::Integer(values.value(i))))
        }
        DataType::UInt64 => {
            let values = array.as_primitive::<UInt64Type>();
            collect_values(array, |i| {
                let v = values.value(i);
                Some(i64::try_from(v).map_or(Value::Float(v as f64), Value::Integer))
            })
        }
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let casted = cast(array, &DataType::Float64)?;
            let values = casted.as_primitive::<Float64Type>();
            collect_values(array, |i| Some(Value::Float(values.value(i))))
        }
        DataType::Date32 | DataType::Date64 => {
            let casted = cast(array, &DataType::Date32)?;
            let values = casted.as_primitive::<Date32Type>();
            collect_values(array, |i| values.value_as_date(i).map(Value::Date))
        }
        DataType::Timestamp(_, None) => {
            let casted = cast(array, &DataType::Timestamp(TimeUnit::Microsecond, None))?;
            let values = casted.as_primitive::<TimestampMicrosecondType>();
            collect_values(array, |i| values.value_as_datetime(i).map(Value::Timestamp))
        }
        DataType::Timestamp(_, Some(tz)) => {
            let casted = cast(
                array,
                &DataType::Timestamp(TimeUnit::Microsecond, Some(tz.clone())),
            )?;
            let values = casted.as_primitive::<TimestampMicrosecondType>();
            collect_values(array, |i| {
                DateTime::from_timestamp_micros(values.value(i)).map(Value::TimestampTz)
            })
        }
        DataType::Time32(_) | DataType::Time64(_) => {
            let casted = cast(array, &DataType::Time64(TimeUnit::Microsecond))?;
            let values = casted.as_primitive::<Time64MicrosecondType>();
            collect_values(array, |i| values.value_as_time(i).map(Value::Time))
        }
        DataType::Binary
        | DataType::LargeBinary
        | DataType::BinaryView
        | DataType::FixedSizeBinary(_) => {
            let casted = cast(array, &DataType::Binary)?;
            let values = casted.as_binary::<i32>();
            collect_values(array, |i| Some(Value::Bytes(values.value(i).to_vec())))
        }
        // Text, decimals, intervals and anything else travel as their text form
        _ => {
            let casted = cast(array, &DataType::Utf8)?;
            let values = casted.as_string::<i32>();
            collect_values(array, |i| Some(Value::Text(values.value(i).to_string())))
        }
    }
}
