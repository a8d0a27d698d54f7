//! Prelude for commonly used types and traits in table-explorer.

pub use crate::analyzers::{
    ColumnFamilies, ColumnFamily, ColumnProfiler, ColumnRef, DateColumn, NumericColumn,
    ProfileState, Summary, TextColumn,
};
pub use crate::config::ExplorerConfig;
pub use crate::error::{ErrorContext, ExplorerError, Result};
pub use crate::explorer::{Explorer, ExplorerBuilder};
pub use crate::formatters::{HumanFormatter, JsonFormatter, MarkdownFormatter, SummaryFormatter};
pub use crate::logging::LogConfig;
pub use crate::sources::{DataFusionSource, Session, SourceSession, TableSource};
pub use crate::table_profile::{ColumnDescriptor, TableProfile, TableState};
pub use crate::types::{QueryResult, TableHandle, Value};
