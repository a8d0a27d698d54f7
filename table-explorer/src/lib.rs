//! # Table Explorer - column profiling for relational tables
//!
//! Table Explorer loads a database table, classifies its columns by declared
//! type and computes descriptive statistics for numeric, text and date
//! columns. Aggregations that must agree with the database (distinct counts,
//! standard deviation, negative counts, mode, character classes, date
//! predicates) run as SQL; the rest is computed from the loaded values.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use datafusion::prelude::*;
//! use table_explorer::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let ctx = SessionContext::new();
//! // ... register a `public.employees` table ...
//!
//! let explorer = Explorer::builder(Arc::new(DataFusionSource::new(ctx)))
//!     .top_n(10)
//!     .build()?;
//!
//! let table = explorer.open_table("public", "employees").await?;
//! if !table.is_empty() {
//!     println!("{}", HumanFormatter::new().format("employees", &table.summary()?)?);
//! }
//!
//! let salary = explorer.profile_numeric("public", "employees", "salary").await?;
//! if !salary.is_empty() {
//!     for entry in &salary.frequent()?.entries {
//!         println!("{} {} {}", entry.value, entry.occurrence, entry.percentage);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`sources`**: the [`TableSource`](sources::TableSource) capability, a
//!   DataFusion-backed source and, with the `postgres` feature, a PostgreSQL
//!   source built on sqlx
//! - **`queries`**: SQL builders; they return `None` for invalid identifiers
//! - **`analyzers`**: column classification and the numeric, text and date
//!   profilers
//! - **`table_profile`**: whole-table load, duplicate and missing-cell counts
//! - **`explorer`**: the caller-facing API, one session per call
//! - **`formatters`**: text, JSON and Markdown rendering of summaries
//!
//! ## Empty data
//!
//! A table with no rows, or a column with no non-missing value, is not an
//! error. It ends in an `Empty` state and no statistic is computed, so check
//! `is_empty()` before reading a summary.

pub mod analyzers;
pub mod config;
pub mod error;
pub mod explorer;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod queries;
pub mod security;
pub mod sources;
pub mod table_profile;
pub mod types;
