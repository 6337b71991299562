// End-to-end tests: question in, SQL out, answer executed
// SQLite fixture databases, a GloVe file on disk and a scripted language model

mod common;

use sqlgen_core::testing::MockLlm;
use sqlgen_core::{LlmRegistry, PromptGenerator};
use sqlgen_database::{Feedback, connect};
use sqlgen_discovery::DiscoveryOrchestrator;
use sqlgen_runner::{GenerationOutcome, GenerationRequest, SqlGenerator};
use std::path::Path;
use std::sync::Arc;

const TOP_RENTED_SQL: &str = "SELECT f.title, COUNT(*) AS rentals
FROM film f
JOIN inventory i ON i.film_id = f.film_id
JOIN rental r ON r.inventory_id = i.inventory_id
GROUP BY f.title
ORDER BY rentals DESC, f.title
LIMIT 5";

fn templates_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"))
}

#[tokio::test]
async fn test_discover_against_sqlite() {
    let fixture = common::sakila_fixture().await.unwrap();
    let services = connect(&fixture.config.database).await.unwrap();
    let discovery = DiscoveryOrchestrator::from_config(&fixture.config, &services)
        .await
        .unwrap();

    assert_eq!(
        discovery.expander().active_model().as_deref(),
        Some("glove-tiny")
    );

    let result = discovery
        .discover("sakila", "Top 5 movies by number of rentals", 90, 5)
        .await
        .unwrap();
    let names = result.table_names();
    assert!(names.contains(&"film"));
    assert!(names.contains(&"rental"));
    assert!(!names.contains(&"customer"));

    let empty = discovery.discover("sakila", "", 90, 5).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_generate_execute_and_rate() {
    let fixture = common::sakila_fixture().await.unwrap();
    let services = connect(&fixture.config.database).await.unwrap();
    let discovery = DiscoveryOrchestrator::from_config(&fixture.config, &services)
        .await
        .unwrap();

    let llm = Arc::new(MockLlm::with_response(format!(
        "Here is the query:\n<SQL>\n{}\n</SQL>",
        TOP_RENTED_SQL
    )));
    let mut registry = LlmRegistry::new();
    registry.add_provider(llm.clone(), vec!["gpt-4o-mini".to_string()]);

    let generator = SqlGenerator::builder()
        .discovery(discovery)
        .llm(Arc::new(registry))
        .prompts(Arc::new(PromptGenerator::load(templates_dir()).unwrap()))
        .template("basic_prompt")
        .history(services.history.clone())
        .build()
        .unwrap();

    let request = GenerationRequest::new(
        "sakila",
        "Top 5 movies by number of rentals",
        "Mock: gpt-4o-mini",
    );
    let generation = generator.generate(&request).await.unwrap();

    let sql = match &generation.outcome {
        GenerationOutcome::Generated { sql, tables, .. } => {
            assert!(tables.iter().any(|t| t.name == "film"));
            sql.clone()
        }
        other => panic!("expected generated SQL, got {:?}", other),
    };
    assert_eq!(sql, TOP_RENTED_SQL);

    // The prompt carried the discovered schema and the question
    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("film (film_id INTEGER PK"));
    assert!(prompt.contains("Question: Top 5 movies by number of rentals"));

    let rows = generator.execute_sql("sakila", &sql).await.unwrap();
    assert_eq!(rows.columns, vec!["title", "rentals"]);
    assert_eq!(rows.rows[0][0], serde_json::json!("ACE GOLDFINGER"));
    assert_eq!(rows.rows[0][1], serde_json::json!(2));

    let record = services
        .history
        .conversation(&generation.conversation_id)
        .await
        .unwrap()
        .expect("conversation recorded");
    assert_eq!(record.database_name, "sakila");
    assert_eq!(record.model, "Mock: gpt-4o-mini");

    generator
        .feedback(&generation.conversation_id, 1)
        .await
        .unwrap();
    generator
        .feedback(&generation.conversation_id, -1)
        .await
        .unwrap();
    assert_eq!(
        services
            .history
            .feedback(&generation.conversation_id)
            .await
            .unwrap(),
        Some(Feedback::Negative)
    );
    assert!(generator.feedback(&generation.conversation_id, 5).await.is_err());
}

#[tokio::test]
async fn test_unrelated_question_finds_no_tables() {
    let fixture = common::sakila_fixture().await.unwrap();
    let services = connect(&fixture.config.database).await.unwrap();
    let discovery = DiscoveryOrchestrator::from_config(&fixture.config, &services)
        .await
        .unwrap();

    let llm = Arc::new(MockLlm::new());
    let mut registry = LlmRegistry::new();
    registry.add_provider(llm.clone(), vec!["gpt-4o-mini".to_string()]);

    let generator = SqlGenerator::builder()
        .discovery(discovery)
        .llm(Arc::new(registry))
        .prompts(Arc::new(PromptGenerator::load(templates_dir()).unwrap()))
        .history(services.history.clone())
        .build()
        .unwrap();

    let request = GenerationRequest::new("sakila", "what is the weather like", "Mock: gpt-4o-mini");
    let generation = generator.generate(&request).await.unwrap();

    assert!(matches!(generation.outcome, GenerationOutcome::NoTablesFound));
    assert!(llm.prompts().is_empty());
}
