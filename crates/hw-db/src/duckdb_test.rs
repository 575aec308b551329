use super::*;
use crate::traits::with_transaction;

fn cases_table(db: &DuckDbBackend) {
    db.execute_batch(
        "CREATE SEQUENCE fact_cases_seq;
         CREATE TABLE fact_cases (
             id INTEGER DEFAULT nextval('fact_cases_seq'),
             country_fk INTEGER NOT NULL,
             cases DOUBLE,
             unique_key VARCHAR UNIQUE NOT NULL,
             created_on TIMESTAMP,
             updated_on TIMESTAMP
         );",
    )
    .unwrap();
}

fn names(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

#[test]
fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[test]
fn test_new_memory_and_file() {
    assert!(DuckDbBackend::new(":memory:").is_ok());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warehouse.duckdb");
    let db = DuckDbBackend::new(path.to_str().unwrap()).unwrap();
    db.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();
    assert!(path.exists());
}

#[test]
fn test_from_config() {
    let config = DatabaseConfig {
        db_type: DbType::DuckDb,
        path: ":memory:".to_string(),
    };
    let db = DuckDbBackend::from_config(&config).unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[test]
fn test_relation_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    cases_table(&db);
    assert!(db.relation_exists(&TableName::new("fact_cases")).unwrap());
    assert!(!db.relation_exists(&TableName::new("nonexistent")).unwrap());
}

#[test]
fn test_relation_exists_schema_qualified() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE SCHEMA dim; CREATE TABLE dim.country (id INTEGER)")
        .unwrap();
    assert!(db.relation_exists(&TableName::new("dim.country")).unwrap());
    assert!(!db.relation_exists(&TableName::new("country")).unwrap());
}

#[test]
fn test_table_columns_in_declaration_order() {
    let db = DuckDbBackend::in_memory().unwrap();
    cases_table(&db);

    let columns = db.table_columns(&TableName::new("fact_cases")).unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "country_fk", "cases", "unique_key", "created_on", "updated_on"]
    );
    assert!(columns[2].is_numeric());
    assert!(!columns[3].is_numeric());
}

#[test]
fn test_table_columns_missing_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.table_columns(&TableName::new("missing")).unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)));
}

#[test]
fn test_lookup_keys_renders_text() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE calendar_week (id INTEGER, iso_year_week INTEGER);
         INSERT INTO calendar_week VALUES (1, 202103), (2, 202104), (3, NULL);",
    )
    .unwrap();

    let mut pairs = db
        .lookup_keys(&TableName::new("calendar_week"), "iso_year_week", "id")
        .unwrap();
    pairs.sort_by_key(|(_, id)| *id);
    assert_eq!(
        pairs,
        vec![
            (Some("202103".to_string()), 1),
            (Some("202104".to_string()), 2),
            (None, 3)
        ]
    );
}

#[test]
fn test_lookup_keys_dates() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE calendar_day (id INTEGER, date DATE);
         INSERT INTO calendar_day VALUES (7, DATE '2021-01-04');",
    )
    .unwrap();

    let pairs = db
        .lookup_keys(&TableName::new("calendar_day"), "date", "id")
        .unwrap();
    assert_eq!(pairs, vec![(Some("2021-01-04".to_string()), 7)]);
}

#[test]
fn test_insert_rows_casts_to_column_types() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (n INTEGER, x DOUBLE, label VARCHAR, ts TIMESTAMP)")
        .unwrap();

    let rows = vec![
        vec![
            Value::Int(1),
            Value::Float(2.5),
            Value::Text("a".into()),
            Value::Text("2024-01-01 00:00:00".into()),
        ],
        vec![Value::Int(2), Value::Null, Value::Null, Value::Null],
    ];
    let inserted = db
        .insert_rows(&TableName::new("t"), &names(&["n", "x", "label", "ts"]), &rows)
        .unwrap();
    assert_eq!(inserted, 2);

    let ts: String = db
        .conn()
        .query_row("SELECT CAST(ts AS VARCHAR) FROM t WHERE n = 1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(ts, "2024-01-01 00:00:00");
    assert_eq!(db.query_count("SELECT * FROM t WHERE x IS NULL").unwrap(), 1);
}

#[test]
fn test_drop_if_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    cases_table(&db);
    let name = TableName::new("fact_cases");

    db.drop_if_exists(&name).unwrap();
    assert!(!db.relation_exists(&name).unwrap());
    // Dropping again is a no-op
    db.drop_if_exists(&name).unwrap();
}

#[test]
fn test_create_staging_copies_column_types() {
    let db = DuckDbBackend::in_memory().unwrap();
    cases_table(&db);

    let staging = TableName::new("stg_test");
    let sql = db.create_staging_sql(
        &staging,
        &TableName::new("fact_cases"),
        &names(&["country_fk", "cases"]),
    );
    db.execute(&sql).unwrap();

    assert!(db.relation_exists(&staging).unwrap());
    assert_eq!(db.query_count("SELECT * FROM stg_test").unwrap(), 0);

    let err = db.execute(&sql).unwrap_err();
    assert!(matches!(err, DbError::AlreadyExists(_)), "got {err:?}");
}

#[test]
fn test_upsert_sql_updates_and_preserves() {
    let db = DuckDbBackend::in_memory().unwrap();
    cases_table(&db);
    db.execute_batch(
        "INSERT INTO fact_cases (country_fk, cases, unique_key, created_on, updated_on)
         VALUES (1, 10, '1', TIMESTAMP '2024-01-01', TIMESTAMP '2024-01-01');
         CREATE TEMPORARY TABLE stg AS
         SELECT 1 AS country_fk, 20.0 AS cases, '1' AS unique_key,
                TIMESTAMP '2024-02-01' AS created_on, TIMESTAMP '2024-02-01' AS updated_on
         UNION ALL
         SELECT 2, 5.0, '2', TIMESTAMP '2024-02-01', TIMESTAMP '2024-02-01';",
    )
    .unwrap();

    let columns = names(&["country_fk", "cases", "unique_key", "created_on", "updated_on"]);
    let sql = db.upsert_sql(
        &TableName::new("fact_cases"),
        &TableName::new("stg"),
        &columns,
        "unique_key",
        &names(&["cases", "updated_on"]),
    );
    db.execute(&sql).unwrap();

    assert_eq!(db.query_count("SELECT * FROM fact_cases").unwrap(), 2);
    let (cases, created): (f64, String) = db
        .conn()
        .query_row(
            "SELECT cases, CAST(created_on AS VARCHAR) FROM fact_cases WHERE unique_key = '1'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(cases, 20.0);
    assert_eq!(created, "2024-01-01 00:00:00");
}

#[test]
fn test_upsert_sql_without_updates_does_nothing() {
    let db = DuckDbBackend::in_memory().unwrap();
    let sql = db.upsert_sql(
        &TableName::new("t"),
        &TableName::new("s"),
        &names(&["unique_key"]),
        "unique_key",
        &[],
    );
    assert!(sql.ends_with("ON CONFLICT (\"unique_key\") DO NOTHING"));
}

#[test]
fn test_with_transaction_commits() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (n INTEGER)").unwrap();

    let result: DbResult<()> = with_transaction(&db, || {
        db.execute("INSERT INTO t VALUES (1)")?;
        Ok(())
    });
    result.unwrap();
    assert_eq!(db.query_count("SELECT * FROM t").unwrap(), 1);
}

#[test]
fn test_with_transaction_rolls_back_on_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (n INTEGER)").unwrap();

    let result: DbResult<()> = with_transaction(&db, || {
        db.execute("INSERT INTO t VALUES (1)")?;
        db.execute("INSERT INTO missing VALUES (1)")?;
        Ok(())
    });
    assert!(result.is_err());
    assert_eq!(db.query_count("SELECT * FROM t").unwrap(), 0);
}

#[test]
fn test_table_not_found_classification() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.execute("SELECT * FROM nowhere").unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)), "got {err:?}");
}
