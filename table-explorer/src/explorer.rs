//! Caller-facing entry point.
//!
//! An [`Explorer`] pairs a [`TableSource`] with an [`ExplorerConfig`]. Every
//! method opens its own session, runs one pass and closes the session again,
//! whether the pass succeeded or not. Nothing is cached between calls.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::analyzers::{
    classify, ColumnFamilies, ColumnProfiler, ColumnRef, DateColumn, NumericColumn, ProfileState,
    TextColumn,
};
use crate::config::ExplorerConfig;
use crate::error::Result;
use crate::logging::LogConfig;
use crate::sources::{Session, TableSource};
use crate::table_profile::{describe_table, ColumnDescriptor, TableProfile};
use crate::types::TableHandle;

/// Profiles tables and columns of one data source.
#[derive(Debug, Clone)]
pub struct Explorer {
    source: Arc<dyn TableSource>,
    config: ExplorerConfig,
}

impl Explorer {
    /// Creates an explorer with the default configuration.
    pub fn new(source: Arc<dyn TableSource>) -> Self {
        Self {
            source,
            config: ExplorerConfig::default(),
        }
    }

    pub fn builder(source: Arc<dyn TableSource>) -> ExplorerBuilder {
        ExplorerBuilder::new(source)
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<dyn TableSource> {
        &self.source
    }

    async fn open_session(&self) -> Result<Session> {
        Session::open(
            self.source.as_ref(),
            self.config.query_timeout,
            self.config.log.clone(),
        )
        .await
    }

    /// `schema.table` names outside the excluded schemas.
    #[instrument(skip(self))]
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let mut session = self.open_session().await?;
        let result = session.list_tables(&self.config.excluded_schemas).await;
        session.finish(result).await
    }

    /// Loads a table and its derived scalars.
    #[instrument(skip(self))]
    pub async fn open_table(&self, schema: &str, table: &str) -> Result<TableProfile> {
        let mut profile = TableProfile::new(TableHandle::new(schema, table));
        let mut session = self.open_session().await?;
        let result = profile.load(&mut session, &self.config).await;
        session.finish(result).await?;
        Ok(profile)
    }

    /// Catalog description of a table's columns.
    #[instrument(skip(self), fields(table = %handle))]
    pub async fn table_schema(&self, handle: &TableHandle) -> Result<Vec<ColumnDescriptor>> {
        let mut session = self.open_session().await?;
        let result = describe_table(&mut session, handle).await;
        session.finish(result).await
    }

    /// Groups a table's columns by family.
    #[instrument(skip(self))]
    pub async fn classify(&self, schema: &str, table: &str) -> Result<ColumnFamilies> {
        let mut session = self.open_session().await?;
        let result = classify(&mut session, schema, table).await;
        session.finish(result).await
    }

    /// Loads a numeric column and computes its statistics.
    pub async fn profile_numeric(&self, schema: &str, table: &str, column: &str) -> Result<NumericColumn> {
        self.profile(NumericColumn::new(ColumnRef::new(schema, table, column)))
            .await
    }

    /// Loads a text column and computes its statistics.
    pub async fn profile_text(&self, schema: &str, table: &str, column: &str) -> Result<TextColumn> {
        self.profile(TextColumn::new(ColumnRef::new(schema, table, column)))
            .await
    }

    /// Loads a date column and computes its statistics.
    pub async fn profile_date(&self, schema: &str, table: &str, column: &str) -> Result<DateColumn> {
        self.profile(DateColumn::new(ColumnRef::new(schema, table, column)))
            .await
    }

    /// Runs a full pass of `profiler` on one session. An empty column stops
    /// after loading.
    #[instrument(skip(self, profiler), fields(column = %profiler.column(), family = %profiler.family()))]
    pub async fn profile<P: ColumnProfiler>(&self, mut profiler: P) -> Result<P> {
        let mut session = self.open_session().await?;
        let result = run_pass(&mut profiler, &mut session, &self.config).await;
        let state = session.finish(result).await?;
        info!(%state, "Profiled column");
        Ok(profiler)
    }
}

async fn run_pass<P: ColumnProfiler>(
    profiler: &mut P,
    session: &mut Session,
    config: &ExplorerConfig,
) -> Result<ProfileState> {
    if profiler.load(session).await? == ProfileState::Empty {
        return Ok(ProfileState::Empty);
    }
    profiler.compute(session, config).await?;
    Ok(profiler.state())
}

/// Builder for [`Explorer`].
#[derive(Debug)]
pub struct ExplorerBuilder {
    source: Arc<dyn TableSource>,
    config: ExplorerConfig,
}

impl ExplorerBuilder {
    pub fn new(source: Arc<dyn TableSource>) -> Self {
        Self {
            source,
            config: ExplorerConfig::default(),
        }
    }

    /// Number of entries kept in frequency tables.
    pub fn top_n(mut self, top_n: usize) -> Self {
        self.config.top_n = top_n;
        self
    }

    /// Maximum number of histogram bins for numeric columns.
    pub fn histogram_max_bins(mut self, bins: usize) -> Self {
        self.config.histogram_max_bins = bins;
        self
    }

    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.config.preview_rows = rows;
        self
    }

    /// Schemas hidden from [`Explorer::list_tables`].
    pub fn excluded_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.excluded_schemas = schemas.into_iter().map(Into::into).collect();
        self
    }

    /// Fails any single query that runs longer than `timeout`.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = Some(timeout);
        self
    }

    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.config.log = log;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ExplorerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and builds the explorer.
    pub fn build(self) -> Result<Explorer> {
        self.config.validate()?;
        Ok(Explorer {
            source: self.source,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExplorerError;
    use crate::sources::DataFusionSource;
    use datafusion::prelude::SessionContext;

    fn source() -> Arc<dyn TableSource> {
        Arc::new(DataFusionSource::new(SessionContext::new()))
    }

    #[test]
    fn test_builder_applies_settings() {
        let explorer = Explorer::builder(source())
            .top_n(5)
            .histogram_max_bins(10)
            .preview_rows(3)
            .excluded_schemas(["information_schema"])
            .query_timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let config = explorer.config();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.histogram_max_bins, 10);
        assert_eq!(config.preview_rows, 3);
        assert_eq!(config.excluded_schemas, vec!["information_schema".to_string()]);
        assert_eq!(config.query_timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let err = Explorer::builder(source())
            .histogram_max_bins(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ExplorerError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_malformed_identifier_is_rejected() {
        let explorer = Explorer::new(source());
        let err = explorer
            .profile_numeric("public", "employees; drop table x", "salary")
            .await
            .unwrap_err();
        assert!(matches!(err, ExplorerError::MalformedQuery { .. }));
    }
}
