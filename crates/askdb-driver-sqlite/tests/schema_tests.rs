//! Integration tests for SQLite schema reflection

use askdb_core::{AskdbError, Connection, PrimaryKeyStyle, SchemaIntrospection};
use askdb_driver_sqlite::{
    ReflectOptions, ReflectionError, SqliteConnection, reflect_schema, reflect_schema_at,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Helper to create a database file populated by `setup`
fn setup_database(setup: &str) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("shop.db");

    let conn = rusqlite::Connection::open(&path).expect("Failed to create test database");
    conn.execute_batch(setup).expect("Failed to setup schema");

    (dir, path)
}

#[test]
fn test_empty_database_yields_empty_document() {
    // Writing the header makes this a real, if empty, database file
    let (_dir, path) = setup_database("PRAGMA user_version = 7;");

    let doc = reflect_schema_at(&path, ReflectOptions::default()).expect("Failed to reflect");

    assert!(doc.is_empty());
    assert_eq!(doc.render(), "");
}

#[test]
fn test_single_table_annotations() {
    let (_dir, path) =
        setup_database("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);");

    let doc = reflect_schema_at(&path, ReflectOptions::default()).unwrap();

    let expected = indoc! {"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );"};
    assert_eq!(doc.render(), expected);
    assert_eq!(doc.render().matches("CREATE TABLE").count(), 1);
}

#[test]
fn test_system_tables_are_excluded() {
    let (_dir, path) = setup_database(
        "CREATE TABLE orders (id INTEGER PRIMARY KEY AUTOINCREMENT, total REAL);
         INSERT INTO orders (total) VALUES (10.5), (20.0);
         CREATE INDEX idx_orders_total ON orders(total);
         ANALYZE;",
    );

    // AUTOINCREMENT creates sqlite_sequence, ANALYZE creates sqlite_stat1
    let conn = rusqlite::Connection::open(&path).unwrap();
    let catalog: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(catalog.iter().any(|n| n == "sqlite_sequence"));
    assert!(catalog.iter().any(|n| n == "sqlite_stat1"));

    let doc = reflect_schema(&conn).unwrap();
    let names: Vec<&str> = doc.tables().iter().map(|t| t.name.as_str()).collect();

    assert_eq!(names, vec!["orders"]);
    assert!(!doc.render().contains("sqlite_"));
}

#[test]
fn test_column_order_matches_declaration() {
    let (_dir, path) = setup_database(
        "CREATE TABLE readings (zeta REAL, alpha TEXT NOT NULL, mid INTEGER, beta BLOB);",
    );

    let doc = reflect_schema_at(&path, ReflectOptions::default()).unwrap();
    let table = doc.table("readings").expect("table reflected");
    let columns: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();

    assert_eq!(columns, vec!["zeta", "alpha", "mid", "beta"]);
    assert_eq!(
        doc.render(),
        "CREATE TABLE readings (\n    zeta REAL,\n    alpha TEXT NOT NULL,\n    mid INTEGER,\n    beta BLOB\n);"
    );
}

#[test]
fn test_table_order_follows_catalog() {
    let (_dir, path) = setup_database(
        "CREATE TABLE zebra (id INTEGER);
         CREATE TABLE apple (id INTEGER);
         CREATE TABLE mango (id INTEGER);",
    );

    let doc = reflect_schema_at(&path, ReflectOptions::default()).unwrap();
    let names: Vec<&str> = doc.tables().iter().map(|t| t.name.as_str()).collect();

    assert_eq!(names, vec!["zebra", "apple", "mango"]);
}

#[test]
fn test_reflection_is_additive() {
    let (_dir, path) = setup_database(
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE products (id INTEGER PRIMARY KEY, price REAL NOT NULL);",
    );

    let before = reflect_schema_at(&path, ReflectOptions::default()).unwrap();

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE sales (id INTEGER PRIMARY KEY, customer_id INTEGER);")
        .unwrap();
    drop(conn);

    let after = reflect_schema_at(&path, ReflectOptions::default()).unwrap();

    let before_statements = before.statements();
    let after_statements = after.statements();
    assert_eq!(after_statements.len(), before_statements.len() + 1);
    for statement in &before_statements {
        assert!(after_statements.contains(statement));
    }
    assert!(after.render().starts_with(&before.render()));
    assert!(after.render().ends_with("CREATE TABLE sales (\n    id INTEGER PRIMARY KEY,\n    customer_id INTEGER\n);"));
}

#[test]
fn test_missing_file_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.db");

    let err = reflect_schema_at(&path, ReflectOptions::default()).unwrap_err();

    assert!(matches!(err, ReflectionError::Open { .. }));
    assert!(!path.exists(), "reflection must never create the database");
    assert!(matches!(AskdbError::from(err), AskdbError::Connection(_)));
}

#[test]
fn test_corrupt_file_fails_instead_of_returning_partial_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.db");
    std::fs::write(&path, b"this is not a sqlite database, not even close....").unwrap();

    let err = reflect_schema_at(&path, ReflectOptions::default()).unwrap_err();

    assert!(matches!(
        err,
        ReflectionError::Open { .. } | ReflectionError::Catalog(_)
    ));
}

#[test]
fn test_column_failure_after_first_table_discards_everything() {
    // A virtual table whose module is never registered loads fine from the
    // catalog but cannot report its columns.
    let (_dir, path) = setup_database(
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         PRAGMA writable_schema = ON;
         INSERT INTO sqlite_master (type, name, tbl_name, rootpage, sql)
         VALUES ('table', 'broken', 'broken', 0, 'CREATE VIRTUAL TABLE broken USING missing_module');
         PRAGMA writable_schema = OFF;",
    );

    let err = reflect_schema_at(&path, ReflectOptions::default()).unwrap_err();
    match &err {
        ReflectionError::Columns { table, .. } => assert_eq!(table, "broken"),
        other => panic!("expected a column error, got {:?}", other),
    }

    let conn = SqliteConnection::open(path.to_str().unwrap()).unwrap();
    let err = conn.reflect_schema(ReflectOptions::default()).unwrap_err();
    assert!(matches!(err, AskdbError::Schema(_)));
}

#[test]
fn test_rendered_ddl_recreates_the_schema() {
    let (_dir, path) = setup_database(
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT);
         CREATE TABLE \"order items\" (id INTEGER PRIMARY KEY, \"unit price\" REAL NOT NULL, misc);
         CREATE TABLE \"order\" (id INTEGER PRIMARY KEY, \"group\" TEXT NOT NULL, \"Select\" TEXT);
         CREATE TABLE enrollments (
             student_id INTEGER NOT NULL,
             course_id INTEGER NOT NULL,
             grade TEXT,
             PRIMARY KEY (student_id, course_id)
         );",
    );

    let doc = reflect_schema_at(
        &path,
        ReflectOptions::default().with_primary_key_style(PrimaryKeyStyle::TableConstraint),
    )
    .unwrap();

    let fresh = rusqlite::Connection::open_in_memory().unwrap();
    fresh
        .execute_batch(&doc.render())
        .expect("rendered DDL should execute");

    let round_trip = reflect_schema(&fresh)
        .unwrap()
        .with_style(PrimaryKeyStyle::TableConstraint);
    assert_eq!(round_trip.render(), doc.render());
    assert_eq!(round_trip.tables(), doc.tables());
    assert!(doc.render().contains("CREATE TABLE \"order\" (\n    id INTEGER PRIMARY KEY,\n    \"group\" TEXT NOT NULL,"));
}

#[test]
fn test_composite_key_styles() {
    let (_dir, path) = setup_database(
        "CREATE TABLE enrollments (
             student_id INTEGER NOT NULL,
             course_id INTEGER NOT NULL,
             PRIMARY KEY (student_id, course_id)
         );",
    );

    let per_column = reflect_schema_at(&path, ReflectOptions::default()).unwrap();
    assert_eq!(
        per_column.render(),
        indoc! {"
            CREATE TABLE enrollments (
                student_id INTEGER NOT NULL PRIMARY KEY,
                course_id INTEGER NOT NULL PRIMARY KEY
            );"}
    );

    let constraint = per_column.with_style(PrimaryKeyStyle::TableConstraint);
    assert_eq!(
        constraint.render(),
        indoc! {"
            CREATE TABLE enrollments (
                student_id INTEGER NOT NULL,
                course_id INTEGER NOT NULL,
                PRIMARY KEY (student_id, course_id)
            );"}
    );
}

#[test]
fn test_views_and_indexes_are_not_tables() {
    let (_dir, path) = setup_database(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
         CREATE INDEX idx_users_name ON users(name);
         CREATE VIEW user_names AS SELECT name FROM users;",
    );

    let doc = reflect_schema_at(&path, ReflectOptions::default()).unwrap();

    assert_eq!(doc.tables().len(), 1);
    assert_eq!(doc.tables()[0].name, "users");
}

#[tokio::test]
async fn test_introspection_matches_reflector() {
    let (_dir, path) = setup_database(
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE sales (id INTEGER PRIMARY KEY AUTOINCREMENT, customer_id INTEGER, total REAL);",
    );

    let conn = SqliteConnection::open_read_only(path.to_str().unwrap()).unwrap();
    let introspection = conn
        .as_schema_introspection()
        .expect("Should have schema introspection");

    let tables = introspection.list_tables().await.unwrap();
    assert_eq!(tables, vec!["customers", "sales"]);

    let columns = introspection.get_columns("sales").await.unwrap();
    assert_eq!(columns.len(), 3);
    assert!(columns[0].is_primary_key());

    let via_trait = introspection
        .schema_document(PrimaryKeyStyle::PerColumn)
        .await
        .unwrap();
    let direct = reflect_schema_at(&path, ReflectOptions::default()).unwrap();
    assert_eq!(via_trait, direct);
    assert_eq!(conn.reflect_schema(ReflectOptions::default()).unwrap(), direct);
}

#[tokio::test]
async fn test_read_only_connection_rejects_writes() {
    let (_dir, path) = setup_database("CREATE TABLE users (id INTEGER PRIMARY KEY);");

    let conn = SqliteConnection::open_read_only(path.to_str().unwrap()).unwrap();
    assert!(conn.is_read_only());
    let err = conn
        .execute("INSERT INTO users (id) VALUES (1)", &[])
        .await
        .unwrap_err();

    assert!(err.is_query());
}
