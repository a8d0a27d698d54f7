//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arrow::array::{Date32Array, Float64Array, Int32Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::NaiveDate;
use datafusion::prelude::SessionContext;
use table_explorer::error::{ExplorerError, Result};
use table_explorer::sources::{DataFusionSource, SourceSession, TableSource};
use table_explorer::types::{QueryResult, Value};

/// Days since the Unix epoch.
pub fn days(y: i32, m: u32, d: u32) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    (NaiveDate::from_ymd_opt(y, m, d).unwrap() - epoch).num_days() as i32
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn employees_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("employee_id", DataType::Int32, false),
        Field::new("last_name", DataType::Utf8, true),
        Field::new("salary", DataType::Float64, true),
        Field::new("birth_date", DataType::Date32, true),
    ]))
}

/// Eight employees: one exact duplicate row, three missing cells.
pub fn employees_batch() -> RecordBatch {
    RecordBatch::try_new(
        employees_schema(),
        vec![
            Arc::new(Int32Array::from(vec![1, 2, 3, 4, 5, 6, 7, 3])),
            Arc::new(StringArray::from(vec![
                Some("King"),
                Some("Kochhar"),
                Some("De Haan"),
                Some("hunold"),
                Some("ERNST"),
                None,
                Some("42"),
                Some("De Haan"),
            ])),
            Arc::new(Float64Array::from(vec![
                Some(24000.0),
                Some(17000.0),
                Some(17000.0),
                Some(-500.0),
                Some(0.0),
                None,
                Some(6000.0),
                Some(17000.0),
            ])),
            Arc::new(Date32Array::from(vec![
                Some(days(1987, 6, 17)),
                Some(days(1989, 9, 21)),
                Some(days(1993, 1, 13)),
                Some(days(1990, 1, 3)),
                Some(days(1970, 1, 1)),
                Some(days(1900, 1, 1)),
                None,
                Some(days(1993, 1, 13)),
            ])),
        ],
    )
    .unwrap()
}

/// One `integer`, one `varchar(50)` (declared through the source) and one
/// `timestamp` column.
pub fn events_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("event_id", DataType::Int32, false),
        Field::new("label", DataType::Utf8, true),
        Field::new(
            "happened_at",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
    ]));
    let noon = date(2024, 3, 1).and_hms_opt(12, 0, 0).unwrap();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int32Array::from(vec![1, 2])),
            Arc::new(StringArray::from(vec![Some("signup"), Some("login")])),
            Arc::new(TimestampMicrosecondArray::from(vec![
                Some(noon.and_utc().timestamp_micros()),
                None,
            ])),
        ],
    )
    .unwrap()
}

/// Three rows whose only column is NULL everywhere.
pub fn blank_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![Field::new("remark", DataType::Utf8, true)]));
    RecordBatch::try_new(
        schema,
        vec![Arc::new(StringArray::from(vec![None::<&str>, None, None]))],
    )
    .unwrap()
}

/// `employees`, `events`, `blank` and a zero-row `empty_table`.
pub fn employees_context() -> SessionContext {
    let ctx = SessionContext::new();
    ctx.register_batch("employees", employees_batch()).unwrap();
    ctx.register_batch("events", events_batch()).unwrap();
    ctx.register_batch("blank", blank_batch()).unwrap();
    ctx.register_batch("empty_table", RecordBatch::new_empty(employees_schema()))
        .unwrap();
    ctx
}

pub fn employees_source() -> DataFusionSource {
    DataFusionSource::new(employees_context())
        .with_primary_key("public", "employees", "employee_id")
        .with_declared_type("public", "events", "label", "varchar(50)")
}

/// `public.pay` with a mixed-case `Salary` column and a column named `user`.
pub fn pay_source() -> DataFusionSource {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Salary", DataType::Float64, true),
        Field::new("user", DataType::Int32, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(vec![Some(100.0), Some(-20.0), None, Some(100.0)])),
            Arc::new(Int32Array::from(vec![10, 11, 12, 13])),
        ],
    )
    .unwrap();
    let ctx = SessionContext::new();
    ctx.register_batch("pay", batch).unwrap();
    DataFusionSource::new(ctx)
}

/// A one-cell result, the shape of every aggregate query.
pub fn scalar(value: impl Into<Value>) -> QueryResult {
    QueryResult::new(vec!["value".to_string()], vec![vec![value.into()]])
}

#[derive(Debug, Clone)]
enum Response {
    Rows(QueryResult),
    Fail(String),
}

/// What a [`ScriptedSource`] observed.
#[derive(Debug, Default)]
pub struct ScriptLog {
    pub executed: Vec<String>,
    pub opened: usize,
    pub closed: usize,
}

/// Answers chosen statements with canned results and passes every other
/// statement to an inner source.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    inner: Arc<dyn TableSource>,
    responses: HashMap<String, Response>,
    log: Arc<Mutex<ScriptLog>>,
}

impl ScriptedSource {
    pub fn new(inner: impl TableSource + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            responses: HashMap::new(),
            log: Arc::new(Mutex::new(ScriptLog::default())),
        }
    }

    pub fn respond(mut self, sql: impl Into<String>, result: QueryResult) -> Self {
        self.responses.insert(sql.into(), Response::Rows(result));
        self
    }

    pub fn fail(mut self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses.insert(sql.into(), Response::Fail(message.into()));
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.log.lock().unwrap().executed.clone()
    }

    /// `(opened, closed)` session counts.
    pub fn sessions(&self) -> (usize, usize) {
        let log = self.log.lock().unwrap();
        (log.opened, log.closed)
    }
}

#[async_trait]
impl TableSource for ScriptedSource {
    async fn open(&self) -> Result<Box<dyn SourceSession>> {
        let inner = self.inner.open().await?;
        self.log.lock().unwrap().opened += 1;
        Ok(Box::new(ScriptedSession {
            inner,
            responses: self.responses.clone(),
            log: Arc::clone(&self.log),
        }))
    }

    fn description(&self) -> String {
        format!("scripted {}", self.inner.description())
    }
}

struct ScriptedSession {
    inner: Box<dyn SourceSession>,
    responses: HashMap<String, Response>,
    log: Arc<Mutex<ScriptLog>>,
}

#[async_trait]
impl SourceSession for ScriptedSession {
    async fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        self.log.lock().unwrap().executed.push(sql.to_string());
        match self.responses.get(sql) {
            Some(Response::Rows(result)) => Ok(result.clone()),
            Some(Response::Fail(message)) => Err(ExplorerError::query(sql, message.clone())),
            None => self.inner.execute(sql).await,
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.log.lock().unwrap().closed += 1;
        self.inner.close().await
    }
}
