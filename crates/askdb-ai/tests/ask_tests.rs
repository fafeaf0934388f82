//! End-to-end question answering against SQLite with a scripted chat model

use askdb_ai::{
    AiError, AiResult, ChatMessage, ChatModel, InMemoryTrainingStore, ProviderMetadata, TextToSql,
    TrainingData, TrainingStore,
};
use askdb_core::{AskdbError, Value};
use askdb_driver_sqlite::{ReflectOptions, SqliteConnection};
use async_trait::async_trait;
use indoc::indoc;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

struct ScriptedChat {
    replies: Mutex<Vec<String>>,
}

impl ScriptedChat {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, _messages: &[ChatMessage]) -> AiResult<String> {
        self.replies
            .lock()
            .pop()
            .ok_or_else(|| AiError::Network("no scripted reply left".to_string()))
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new("Scripted", "test")
    }
}

fn shop() -> SqliteConnection {
    let conn = SqliteConnection::open(":memory:").expect("Failed to open in-memory db");
    conn.execute_batch(indoc! {"
        CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT NOT NULL, price REAL NOT NULL);
        CREATE TABLE sale_items (id INTEGER PRIMARY KEY, product_id INTEGER, quantity INTEGER);
        INSERT INTO products VALUES (1, 'Laptop', 2500.0), (2, 'Mouse', 25.0);
        INSERT INTO sale_items VALUES (1, 1, 1), (2, 2, 3);
    "})
    .expect("Failed to seed");
    conn
}

#[tokio::test]
async fn test_ask_runs_generated_sql() {
    let conn = shop();
    let chat = ScriptedChat::new(&[indoc! {"
        ```sql
        SELECT p.name, SUM(si.quantity) AS sold
        FROM sale_items si JOIN products p ON p.id = si.product_id
        GROUP BY p.name
        ORDER BY sold DESC
        ```"}]);
    let agent = TextToSql::new(chat, InMemoryTrainingStore::new());

    let schema = conn.reflect_schema(ReflectOptions::default()).unwrap();
    agent.train(TrainingData::from(&schema)).await.unwrap();

    let answer = agent.ask(&conn, "Which products sell the most?").await.unwrap();

    assert!(answer.sql.starts_with("SELECT p.name"));
    let result = answer.outcome.expect("query should succeed");
    assert_eq!(result.column_names(), vec!["name", "sold"]);
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.rows[0].get(0), Some(&Value::String("Mouse".to_string())));
    assert_eq!(result.rows[0].get(1), Some(&Value::Int64(3)));
}

#[tokio::test]
async fn test_invalid_sql_is_reported_in_answer() {
    let conn = shop();
    let chat = ScriptedChat::new(&[
        "SELECT nope FROM missing_table;",
        "SELECT COUNT(*) FROM products;",
    ]);
    let agent = TextToSql::new(chat, InMemoryTrainingStore::new());

    let failed = agent.ask(&conn, "Broken question").await.unwrap();
    assert_eq!(failed.sql, "SELECT nope FROM missing_table");
    assert!(!failed.is_success());
    assert!(matches!(failed.outcome, Err(AskdbError::Query(_))));

    // The next question still runs on the same connection
    let ok = agent.ask(&conn, "How many products?").await.unwrap();
    assert_eq!(ok.outcome.unwrap().rows[0].get(0), Some(&Value::Int64(2)));
}

#[tokio::test]
async fn test_schema_training_is_idempotent() {
    let conn = shop();
    let agent = TextToSql::new(ScriptedChat::new(&[]), InMemoryTrainingStore::new());
    let schema = conn.reflect_schema(ReflectOptions::default()).unwrap();

    let first = agent.train(TrainingData::from(&schema)).await.unwrap();
    let second = agent.train(TrainingData::from(&schema)).await.unwrap();

    assert_eq!(first, second);
    let ddl = agent.store().related_ddl("anything").await.unwrap();
    assert_eq!(ddl, vec![schema.render()]);
}
