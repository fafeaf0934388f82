//! Demo dataset: a small electronics shop

use anyhow::{Context, Result};
use askdb_driver_sqlite::SqliteConnection;

/// Business knowledge trained alongside the schema
pub const DOCUMENTATION: &str = "\
Our company sells consumer electronics.
Customers are people who made at least one purchase.
Each sale can contain several items of different products.
The total of a sale is the sum of unit price times quantity over its items.";

/// Example query trained without a question; the model phrases one
pub const EXAMPLE_SQL: &str = "\
SELECT c.name, SUM(s.total) AS total_spent
FROM customers c
JOIN sales s ON c.id = s.customer_id
GROUP BY c.name
ORDER BY total_spent DESC";

pub const QUESTIONS: [&str; 2] = [
    "Which products sell the most?",
    "List customers with the products, price and quantity they bought where the unit price is above 2000.00.",
];

/// Creates the demo tables and rows; safe to run repeatedly
pub const SEED_SQL: &str = "
CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    signup_date TEXT
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    price REAL NOT NULL,
    stock INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS sales (
    id INTEGER PRIMARY KEY,
    customer_id INTEGER,
    sale_date TEXT,
    total REAL,
    FOREIGN KEY (customer_id) REFERENCES customers (id)
);

CREATE TABLE IF NOT EXISTS sale_items (
    id INTEGER PRIMARY KEY,
    sale_id INTEGER,
    product_id INTEGER,
    quantity INTEGER,
    unit_price REAL,
    FOREIGN KEY (sale_id) REFERENCES sales (id),
    FOREIGN KEY (product_id) REFERENCES products (id)
);

INSERT OR IGNORE INTO customers (id, name, email, signup_date) VALUES
    (1, 'Maria Silva', 'maria@example.com', '2023-01-15'),
    (2, 'John Santos', 'john@example.com', '2023-02-20');

INSERT OR IGNORE INTO products (id, name, price, stock) VALUES
    (1, 'Notebook', 3500.00, 10),
    (2, 'Smartphone', 1800.00, 15);

INSERT OR IGNORE INTO sales (id, customer_id, sale_date, total) VALUES
    (1, 1, '2023-03-10', 3500.00),
    (2, 2, '2023-03-15', 1800.00);

INSERT OR IGNORE INTO sale_items (id, sale_id, product_id, quantity, unit_price) VALUES
    (1, 1, 1, 1, 3500.00),
    (2, 2, 2, 1, 1800.00);
";

/// Create and populate the demo tables
pub fn seed(conn: &SqliteConnection) -> Result<()> {
    conn.execute_batch(SEED_SQL)
        .with_context(|| format!("Failed to seed demo data into {}", conn.path()))?;
    tracing::info!(path = %conn.path(), "demo data seeded");
    Ok(())
}
