mod common;

use std::sync::Arc;

use common::{employees_source, scalar, ScriptedSource};
use table_explorer::prelude::*;
use table_explorer::queries;

#[tokio::test]
async fn test_salary_statistics() {
    let explorer = Explorer::new(Arc::new(employees_source()));
    let salary = explorer
        .profile_numeric("public", "employees", "salary")
        .await
        .unwrap();

    assert_eq!(salary.state(), ProfileState::StatsComputed);
    let stats = salary.stats().unwrap();
    assert_eq!(stats.unique_count, 5);
    assert_eq!(stats.missing_count, 1);
    assert_eq!(stats.mean, 11500.0);
    assert!((stats.std_dev.unwrap() - 9604.686356).abs() < 1e-3);
    assert_eq!(stats.min, -500.0);
    assert_eq!(stats.max, 24000.0);
    assert_eq!(stats.median, 17000.0);
    assert_eq!(stats.zero_count, 1);
    assert_eq!(stats.negative_count, 1);
    assert_eq!(salary.histogram().unwrap().total_count(), 7);

    let summary = salary.summary().unwrap();
    assert_eq!(
        summary.pairs(),
        vec![
            ("Number of Unique Values", "5"),
            ("Number of Rows with Missing Values", "1"),
            ("Number of Rows with 0", "1"),
            ("Number of Rows with Negative Values", "1"),
            ("Average Value", "11,500.000"),
            ("Standard Deviation Value", "9,604.686"),
            ("Minimum Value", "-500.000"),
            ("Maximum Value", "24,000.000"),
            ("Median Value", "17,000.000"),
        ]
    );
    assert_eq!(salary.summary().unwrap(), summary);
}

#[tokio::test]
async fn test_frequent_values() {
    let explorer = Explorer::builder(Arc::new(employees_source()))
        .top_n(2)
        .build()
        .unwrap();
    let salary = explorer
        .profile_numeric("public", "employees", "salary")
        .await
        .unwrap();

    let frequent = salary.frequent().unwrap();
    assert_eq!(frequent.len(), 2);
    assert_eq!(frequent.entries[0].value, Value::Float(17000.0));
    assert_eq!(frequent.entries[0].occurrence, 3);
    assert_eq!(frequent.entries[0].percentage, 0.4286);
    assert_eq!(frequent.entries[1].occurrence, 1);
    assert!(frequent.total_fraction() <= 1.0);
}

#[tokio::test]
async fn test_negative_count_comes_from_database() {
    let negative_sql = queries::negative_query("public", "employees", "salary").unwrap();
    let source = ScriptedSource::new(employees_source()).respond(negative_sql, scalar(4i64));
    let explorer = Explorer::new(Arc::new(source.clone()));

    let salary = explorer
        .profile_numeric("public", "employees", "salary")
        .await
        .unwrap();
    assert_eq!(salary.stats().unwrap().negative_count, 4);

    let executed = source.executed();
    assert_eq!(
        executed,
        vec![
            queries::column_query("public", "employees", "salary").unwrap(),
            queries::unique_query("public", "employees", "salary").unwrap(),
            queries::std_query("public", "employees", "salary").unwrap(),
            queries::negative_query("public", "employees", "salary").unwrap(),
        ]
    );
    assert_eq!(source.sessions(), (1, 1));
}

#[tokio::test]
async fn test_null_standard_deviation() {
    let std_sql = queries::std_query("public", "employees", "salary").unwrap();
    let source = ScriptedSource::new(employees_source()).respond(std_sql, scalar(Value::Null));
    let explorer = Explorer::new(Arc::new(source));

    let salary = explorer
        .profile_numeric("public", "employees", "salary")
        .await
        .unwrap();
    assert_eq!(salary.stats().unwrap().std_dev, None);
    assert_eq!(
        salary.summary().unwrap().get("Standard Deviation Value"),
        Some("n/a")
    );
}

#[tokio::test]
async fn test_failed_statistic_leaves_profiler_loaded() {
    let negative_sql = queries::negative_query("public", "employees", "salary").unwrap();
    let source = ScriptedSource::new(employees_source()).fail(negative_sql, "relation is locked");

    let mut session = Session::open(&source, None, LogConfig::default())
        .await
        .unwrap();
    let mut salary = NumericColumn::new(ColumnRef::new("public", "employees", "salary"));
    assert_eq!(salary.load(&mut session).await.unwrap(), ProfileState::Loaded);

    let err = salary
        .compute(&mut session, &ExplorerConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::Query { .. }));
    assert_eq!(salary.state(), ProfileState::Loaded);
    assert!(matches!(
        salary.summary(),
        Err(ExplorerError::StatsUnavailable { .. })
    ));
    session.close().await.unwrap();

    let explorer = Explorer::new(Arc::new(source.clone()));
    assert!(explorer
        .profile_numeric("public", "employees", "salary")
        .await
        .is_err());
    assert_eq!(source.sessions(), (2, 2));
}

#[tokio::test]
async fn test_integer_column() {
    let explorer = Explorer::new(Arc::new(employees_source()));
    let ids = explorer
        .profile_numeric("public", "employees", "employee_id")
        .await
        .unwrap();

    assert!(ids.values().iter().all(|v| matches!(v, Value::Integer(_))));
    let stats = ids.stats().unwrap();
    assert_eq!(stats.unique_count, 7);
    assert_eq!(stats.missing_count, 0);
    assert_eq!(stats.zero_count, 0);
    assert_eq!(stats.negative_count, 0);
    assert_eq!(stats.max, 7.0);
}
