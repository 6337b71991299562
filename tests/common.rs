//! Common test utilities and helpers
//!
//! Builds an on-disk sakila-style SQLite database, a control database and a
//! small GloVe file, and a configuration pointing at all three.

#![allow(dead_code)]

use sqlgen_core::{EmbeddingModelConfig, SqlGenConfig};
use sqlx::sqlite::SqlitePoolOptions;
use std::io::Write;
use tempfile::TempDir;

const SAKILA_DDL: &[&str] = &[
    "CREATE TABLE film (
        film_id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        release_year INTEGER,
        rental_duration INTEGER NOT NULL DEFAULT 3,
        rental_rate REAL NOT NULL DEFAULT 4.99,
        length INTEGER,
        rating TEXT
    )",
    "CREATE TABLE customer (
        customer_id INTEGER PRIMARY KEY,
        store_id INTEGER NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        create_date TEXT NOT NULL
    )",
    "CREATE TABLE inventory (
        inventory_id INTEGER PRIMARY KEY,
        film_id INTEGER NOT NULL REFERENCES film(film_id),
        store_id INTEGER NOT NULL
    )",
    "CREATE TABLE rental (
        rental_id INTEGER PRIMARY KEY,
        rental_date TEXT NOT NULL,
        inventory_id INTEGER NOT NULL REFERENCES inventory(inventory_id),
        customer_id INTEGER NOT NULL REFERENCES customer(customer_id),
        return_date TEXT
    )",
    "CREATE VIEW film_list AS
        SELECT f.film_id, f.title, f.rating FROM film f",
    "INSERT INTO film (film_id, title, release_year, rating) VALUES
        (1, 'ACADEMY DINOSAUR', 2006, 'PG'),
        (2, 'ACE GOLDFINGER', 2006, 'G'),
        (3, 'ADAPTATION HOLES', 2006, 'NC-17')",
    "INSERT INTO customer (customer_id, store_id, first_name, last_name, email, create_date) VALUES
        (1, 1, 'MARY', 'SMITH', 'mary.smith@example.org', '2006-02-14'),
        (2, 1, 'PATRICIA', 'JOHNSON', NULL, '2006-02-14')",
    "INSERT INTO inventory (inventory_id, film_id, store_id) VALUES (1, 1, 1), (2, 2, 1), (3, 3, 2), (4, 2, 2)",
    "INSERT INTO rental (rental_id, rental_date, inventory_id, customer_id, return_date) VALUES
        (1, '2005-05-24', 2, 1, '2005-05-26'),
        (2, '2005-05-25', 4, 2, NULL),
        (3, '2005-05-26', 1, 1, '2005-05-28')",
];

/// Embedding clusters; each has at least six words
const CLUSTERS: &[&[&str]] = &[
    &["film", "movie", "movies", "films", "picture", "cinema", "video"],
    &["rental", "rentals", "rent", "lease", "hire", "borrowing"],
    &["number", "count", "total", "amount", "quantity", "figure"],
    &["customer", "client", "patron", "buyer", "shopper", "consumer"],
];

pub struct Fixture {
    pub dir: TempDir,
    pub config: SqlGenConfig,
}

/// Create the databases and embedding file and return a matching configuration
pub async fn sakila_fixture() -> anyhow::Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let sakila_path = dir.path().join("sakila.db");

    let setup = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite://{}?mode=rwc", sakila_path.display()))
        .await?;
    for statement in SAKILA_DDL {
        sqlx::query(statement).execute(&setup).await?;
    }
    setup.close().await;

    let glove_path = dir.path().join("glove-tiny.txt");
    let mut glove = std::fs::File::create(&glove_path)?;
    let dimension = CLUSTERS.len() + 1;
    for (axis, words) in CLUSTERS.iter().enumerate() {
        for (rank, word) in words.iter().enumerate() {
            let mut vector = vec![0.0f32; dimension];
            vector[axis] = 1.0;
            vector[dimension - 1] = 0.05 * rank as f32;
            let components: Vec<String> = vector.iter().map(|v| format!("{:.4}", v)).collect();
            writeln!(glove, "{} {}", word, components.join(" "))?;
        }
    }

    let mut config = SqlGenConfig::test_defaults();
    config.database.sqlite_databases.clear();
    config.database.sqlite_databases.insert(
        "sakila".to_string(),
        format!("sqlite://{}", sakila_path.display()),
    );
    config.database.sqlite_control = Some(format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("sql_generator.db").display()
    ));
    config.embeddings.models = vec![EmbeddingModelConfig {
        name: "glove-tiny".to_string(),
        path: glove_path,
    }];
    config.embeddings.default_model = Some("glove-tiny".to_string());

    Ok(Fixture { dir, config })
}
