//! End-to-end tests against a real MySQL server.
//!
//! Skipped unless `TEST_MYSQL_DATABASES` holds a JSON target list, e.g.:
//!
//! ```text
//! TEST_MYSQL_DATABASES='[{"name":"main","host":"127.0.0.1","user":"root","password":"root","database":"test"}]'
//! ```
//!
//! The first target is used. Tests create and drop their own tables.

use multi_mysql_mcp::db::{ConfigStore, MemorySource, MySqlConnector, MySqlRegistry, QueryExecutor};
use multi_mysql_mcp::models::QueryParam;
use multi_mysql_mcp::tools::{
    CommandGate, DescribeTableInput, QueryInput, QueryToolHandler, SchemaToolHandler,
};
use std::sync::Arc;
use std::time::Duration;

const KEY: &str = "TEST_MYSQL_DATABASES";

struct Live {
    target: String,
    registry: Arc<MySqlRegistry>,
    query: QueryToolHandler,
    schema: SchemaToolHandler,
}

fn live(max_rows: u32) -> Option<Live> {
    let Ok(targets) = std::env::var(KEY) else {
        eprintln!("Skipping test: {} not set", KEY);
        return None;
    };

    let store = Arc::new(ConfigStore::new(Arc::new(MemorySource::with(KEY, targets)), KEY));
    let summary = store.load().expect("TEST_MYSQL_DATABASES is a valid target list");
    let registry = Arc::new(MySqlRegistry::new(store, MySqlConnector::new()));
    let gate = Arc::new(CommandGate::from_selector(Some("extended")).unwrap());
    let executor = QueryExecutor::with_defaults(Duration::from_secs(30), max_rows);

    Some(Live {
        target: summary.default_target,
        query: QueryToolHandler::new(registry.clone(), gate, None, executor.clone()),
        schema: SchemaToolHandler::new(registry.clone(), executor),
        registry,
    })
}

fn input(target: &str, sql: &str, params: Vec<QueryParam>) -> QueryInput {
    QueryInput {
        database: Some(target.to_string()),
        sql: Some(sql.to_string()),
        params,
        decode_binary: true,
    }
}

#[tokio::test]
async fn test_select_materializes_one_pool() {
    let Some(live) = live(1000) else { return };

    let first = live
        .query
        .query(input(&live.target, "SELECT 1 AS one, 'x' AS letter", vec![]))
        .await
        .unwrap();
    assert_eq!(first.matched_command.as_deref(), Some("SELECT"));
    assert_eq!(first.row_count, 1);

    live.query
        .query(input(&live.target, "SELECT 2", vec![]))
        .await
        .unwrap();
    assert_eq!(live.registry.pool_count().await, 1);

    let report = live.registry.shutdown_all().await;
    assert!(report.is_clean());
    assert_eq!(report.closed, vec![live.target.clone()]);
}

#[tokio::test]
async fn test_write_read_and_describe() {
    let Some(live) = live(2) else { return };
    let table = "mmm_live_items";
    let run = |sql: String, params: Vec<QueryParam>| live.query.query(input(&live.target, &sql, params));

    run(format!("DROP TABLE IF EXISTS {}", table), vec![]).await.unwrap();
    run(
        format!("CREATE TABLE {} (id INT PRIMARY KEY, label VARCHAR(32))", table),
        vec![],
    )
    .await
    .unwrap();

    let inserted = run(
        format!("INSERT INTO {} VALUES (?, ?), (?, ?), (?, ?)", table),
        vec![
            QueryParam::Int(1),
            QueryParam::String("a".into()),
            QueryParam::Int(2),
            QueryParam::String("b".into()),
            QueryParam::Int(3),
            QueryParam::Null,
        ],
    )
    .await
    .unwrap();
    assert_eq!(inserted.rows_affected, Some(3));

    // Row limit of 2 truncates the three-row result
    let selected = run(format!("SELECT id, label FROM {} ORDER BY id", table), vec![])
        .await
        .unwrap();
    assert_eq!(selected.row_count, 2);
    assert!(selected.truncated);

    let described = live
        .schema
        .describe_table(DescribeTableInput {
            database: Some(live.target.clone()),
            table: Some(table.to_string()),
        })
        .await
        .unwrap();
    assert!(described.create_statement.contains("CREATE TABLE"));
    assert!(described.create_statement.contains("label"));

    run(format!("DROP TABLE {}", table), vec![]).await.unwrap();
    live.registry.shutdown_all().await;
}
