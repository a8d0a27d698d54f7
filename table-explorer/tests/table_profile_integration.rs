mod common;

use std::sync::Arc;

use common::{employees_source, ScriptedSource};
use table_explorer::prelude::*;
use table_explorer::queries;

#[tokio::test]
async fn test_open_table_summary_matches_count() {
    let source = Arc::new(employees_source());
    let explorer = Explorer::new(source.clone());

    let table = explorer.open_table("public", "employees").await.unwrap();
    assert_eq!(table.state(), TableState::Loaded);

    let mut session = Session::open(source.as_ref(), None, LogConfig::default())
        .await
        .unwrap();
    let count = session
        .query("select count(*) from public.employees")
        .await
        .unwrap()
        .scalar_count()
        .unwrap();
    session.close().await.unwrap();

    let summary = table.summary().unwrap();
    assert_eq!(summary.get("Name of Table"), Some("employees"));
    assert_eq!(summary.get("Number of Rows"), Some(count.to_string().as_str()));
    assert_eq!(
        summary.pairs(),
        vec![
            ("Name of Table", "employees"),
            ("Number of Rows", "8"),
            ("Number of Columns", "4"),
            ("Number of Duplicated Rows", "1"),
            ("Number of Rows with Missing Values", "3"),
        ]
    );
    assert_eq!(table.summary().unwrap(), summary);
}

#[tokio::test]
async fn test_open_table_classifies_and_coerces() {
    let explorer = Explorer::new(Arc::new(employees_source()));
    let table = explorer.open_table("public", "employees").await.unwrap();

    assert_eq!(table.row_count(), Some(8));
    assert_eq!(table.column_count(), Some(4));
    assert_eq!(
        table.columns(),
        &["employee_id", "last_name", "salary", "birth_date"]
    );

    let numeric: Vec<&str> = table.numeric_columns().unwrap().iter().map(String::as_str).collect();
    assert_eq!(numeric, vec!["employee_id", "salary"]);
    assert!(table.text_columns().unwrap().contains("last_name"));
    assert!(table.datetime_columns().unwrap().contains("birth_date"));

    let first = table.row(0).unwrap();
    assert_eq!(first["employee_id"], &Value::Integer(1));
    assert_eq!(first["salary"], &Value::Float(24000.0));
    assert_eq!(table.head(3).len(), 3);
    assert_eq!(table.tail(100).len(), 8);
    assert_eq!(table.sample(8).unwrap().len(), 8);
    assert!(table.sample(9).is_err());
}

#[tokio::test]
async fn test_empty_table_skips_classification() {
    let source = ScriptedSource::new(employees_source());
    let explorer = Explorer::new(Arc::new(source.clone()));

    let table = explorer.open_table("public", "empty_table").await.unwrap();
    assert!(table.is_empty());
    assert_eq!(table.row_count(), None);
    assert_eq!(table.column_count(), None);
    assert_eq!(table.duplicate_row_count(), None);
    assert_eq!(table.missing_cell_count(), None);
    assert!(table.families().is_none());
    assert!(matches!(
        table.summary(),
        Err(ExplorerError::StatsUnavailable { .. })
    ));

    assert_eq!(
        source.executed(),
        vec![queries::table_data_query("public", "empty_table").unwrap()]
    );
    assert_eq!(source.sessions(), (1, 1));
}

#[tokio::test]
async fn test_numeric_coercion_failure_fails_load() {
    let data_sql = queries::table_data_query("public", "events").unwrap();
    let source = ScriptedSource::new(employees_source()).respond(
        data_sql,
        QueryResult::new(
            vec!["event_id".to_string(), "label".to_string(), "happened_at".to_string()],
            vec![vec![Value::from("abc"), Value::from("signup"), Value::Null]],
        ),
    );
    let explorer = Explorer::new(Arc::new(source.clone()));

    let err = explorer.open_table("public", "events").await.unwrap_err();
    assert!(matches!(err, ExplorerError::Coercion { ref column, .. } if column == "event_id"));
    assert_eq!(source.sessions(), (1, 1));
}

#[tokio::test]
async fn test_numeric_text_duplicates_compare_by_value() {
    let data_sql = queries::table_data_query("public", "employees").unwrap();
    let columns = ["employee_id", "last_name", "salary", "birth_date"];
    let source = ScriptedSource::new(employees_source()).respond(
        data_sql,
        QueryResult::new(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![
                vec![Value::from("3"), Value::from("De Haan"), Value::from("17000.0"), Value::Null],
                vec![Value::from("3"), Value::from("De Haan"), Value::from("17000.00"), Value::Null],
                vec![Value::from("4"), Value::from("De Haan"), Value::from("17000.00"), Value::Null],
            ],
        ),
    );
    let explorer = Explorer::new(Arc::new(source));

    let table = explorer.open_table("public", "employees").await.unwrap();
    assert_eq!(table.row_count(), Some(3));
    assert_eq!(table.duplicate_row_count(), Some(1));
    assert_eq!(table.missing_cell_count(), Some(3));
    assert_eq!(table.content()[1][2], Value::Float(17000.0));
}

#[tokio::test]
async fn test_table_schema_descriptors() {
    let handle = TableHandle::new("public", "employees");
    let schema_sql = queries::table_schema_query("public", "employees").unwrap();
    let columns = [
        "table_name",
        "column_name",
        "data_type",
        "primary_key",
        "is_nullable",
        "character_maximum_length",
        "numeric_precision",
    ];
    let source = ScriptedSource::new(employees_source()).respond(
        schema_sql,
        QueryResult::new(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![
                vec![
                    Value::from("employees"),
                    Value::from("employee_id"),
                    Value::from("integer"),
                    Value::Boolean(true),
                    Value::from("NO"),
                    Value::Null,
                    Value::Integer(32),
                ],
                vec![
                    Value::from("employees"),
                    Value::from("last_name"),
                    Value::from("character varying"),
                    Value::Boolean(false),
                    Value::from("YES"),
                    Value::Integer(50),
                    Value::Null,
                ],
            ],
        ),
    );
    let explorer = Explorer::new(Arc::new(source));

    let descriptors = explorer.table_schema(&handle).await.unwrap();
    assert_eq!(descriptors.len(), 2);
    assert!(descriptors[0].is_primary_key);
    assert!(!descriptors[0].is_nullable);
    assert_eq!(descriptors[0].numeric_precision, Some(32));
    assert_eq!(descriptors[1].column_name, "last_name");
    assert_eq!(descriptors[1].character_maximum_length, Some(50));
    assert!(!descriptors[1].is_primary_key);
}

#[tokio::test]
async fn test_list_tables_hides_catalog() {
    let explorer = Explorer::new(Arc::new(employees_source()));
    let tables = explorer.list_tables().await.unwrap();
    assert_eq!(
        tables,
        vec![
            "public.blank",
            "public.employees",
            "public.empty_table",
            "public.events",
        ]
    );

    let table: TableHandle = tables[1].parse().unwrap();
    assert_eq!(table, TableHandle::new("public", "employees"));
}

#[tokio::test]
async fn test_malformed_table_name_runs_nothing() {
    let source = ScriptedSource::new(employees_source());
    let explorer = Explorer::new(Arc::new(source.clone()));

    let err = explorer.open_table("public", "").await.unwrap_err();
    assert!(matches!(err, ExplorerError::MalformedQuery { .. }));
    assert!(source.executed().is_empty());
    assert_eq!(source.sessions(), (1, 1));
}
