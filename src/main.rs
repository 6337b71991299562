//! `sqlgen` command line: table discovery and SQL generation against
//! configured databases.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use sqlgen_core::{LlmRegistry, PromptGenerator, SqlGenConfig};
use sqlgen_database::{DatabaseServices, Feedback, QueryRows, connect};
use sqlgen_discovery::{DiscoveryOrchestrator, MatchResult, SchemaIndexCache};
use sqlgen_runner::{GenerationOutcome, GenerationRequest, SqlGenerator, publish_all};
use sqlgen_telemetry::{TelemetryOptions, init_telemetry_with};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "sqlgen",
    version,
    about = "Find the tables relevant to a question and generate SQL for it"
)]
struct Cli {
    /// Configuration file (default: config.toml in this or a parent directory,
    /// then POSTGRES_* / OPENAI_API_KEY environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Embedding space for synonym expansion, for this invocation only
    #[arg(long, global = true)]
    embedding: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the databases available for discovery
    Databases,
    /// Rebuild and persist schema indexes
    Refresh {
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        database: Option<String>,
        /// Every database the catalog lists
        #[arg(long)]
        all: bool,
    },
    /// Show the tables relevant to a question
    Discover(QuestionArgs),
    /// Generate SQL for a question
    Generate {
        #[command(flatten)]
        question: QuestionArgs,
        /// Model id as listed by `sqlgen models`; the first configured model by default
        #[arg(long)]
        model: Option<String>,
        /// Prompt template name
        #[arg(long)]
        template: Option<String>,
    },
    /// Run a SQL statement against a database
    RunSql {
        #[arg(long)]
        database: String,
        sql: String,
    },
    /// Rate a generated answer with +1 or -1
    Feedback {
        conversation_id: String,
        #[arg(allow_hyphen_values = true)]
        value: i32,
    },
    /// List language models and embedding spaces
    Models,
    /// Check that an embedding space loads (pass --embedding to use it)
    UseEmbedding { name: String },
}

#[derive(Args)]
struct QuestionArgs {
    #[arg(long)]
    database: String,
    question: String,
    /// Exclusive lower bound on the match score, 0-100
    #[arg(long)]
    threshold: Option<u8>,
    /// Synonyms added per keyword
    #[arg(long)]
    synonyms: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = SqlGenConfig::load_or_env(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_telemetry_with(TelemetryOptions {
        service_name: config.observability.service_name.clone(),
        json_logs: config.observability.json_logs,
    });

    match cli.command {
        Command::Databases => {
            let services = connect(&config.database).await?;
            for database in services.catalog.list_databases().await? {
                println!("{}", database);
            }
        }
        Command::Refresh { database, all } => {
            let services = connect(&config.database).await?;
            let cache = SchemaIndexCache::new(services.catalog.clone(), services.blobs.clone());
            if all {
                let report = publish_all(services.catalog.as_ref(), &cache).await?;
                for published in &report.published {
                    println!("{}: {} tables", published.database, published.tables);
                }
                for failure in &report.failed {
                    eprintln!("{}: {}", failure.database, failure.error);
                }
                if !report.is_success() {
                    bail!("{} database(s) failed to publish", report.failed.len());
                }
            } else if let Some(database) = database {
                let index = cache.get_index(&database, true).await?;
                println!("{}: {} tables", database, index.len());
            }
        }
        Command::Discover(args) => {
            let services = connect(&config.database).await?;
            let discovery = build_discovery(&config, &services, cli.embedding.as_deref()).await?;
            let result = discovery
                .discover(
                    &args.database,
                    &args.question,
                    args.threshold.unwrap_or(config.discovery.similarity_threshold),
                    args.synonyms.unwrap_or(config.discovery.max_synonyms),
                )
                .await?;
            print_match(&result);
        }
        Command::Generate {
            question,
            model,
            template,
        } => {
            let services = connect(&config.database).await?;
            let discovery = build_discovery(&config, &services, cli.embedding.as_deref()).await?;
            let llm = LlmRegistry::from_config(&config.llm)?;
            let model_id = match model {
                Some(model) => model,
                None => llm
                    .model_ids()
                    .into_iter()
                    .next()
                    .context("No language models configured")?,
            };
            let prompts = PromptGenerator::load(&config.llm.templates_dir)?;

            let generator = SqlGenerator::builder()
                .discovery(discovery)
                .llm(Arc::new(llm))
                .prompts(Arc::new(prompts))
                .template(template.unwrap_or_else(|| config.llm.default_template.clone()))
                .history(services.history.clone())
                .build()?;

            let request = GenerationRequest::new(&question.database, &question.question, model_id)
                .with_similarity_threshold(
                    question
                        .threshold
                        .unwrap_or(config.discovery.similarity_threshold),
                )
                .with_max_synonyms(question.synonyms.unwrap_or(config.discovery.max_synonyms));

            let generation = generator.generate(&request).await?;
            match generation.outcome {
                GenerationOutcome::NoTablesFound => println!("No tables found"),
                GenerationOutcome::Unparsed { response } => println!("Response: {}", response),
                GenerationOutcome::Generated {
                    sql,
                    tables,
                    answer,
                } => {
                    println!("{}", sql);
                    println!();
                    let names: Vec<String> = tables.iter().map(|t| t.qualified_name()).collect();
                    println!("Related tables: {}", names.join(", "));
                    println!(
                        "Tokens: {} prompt, {} completion, cost {:.6}",
                        answer.usage.prompt_tokens, answer.usage.completion_tokens, answer.cost
                    );
                }
            }
            println!("Conversation: {}", generation.conversation_id);
        }
        Command::RunSql { database, sql } => {
            let services = connect(&config.database).await?;
            let rows = services.catalog.execute_sql(&database, &sql).await?;
            print_rows(&rows);
        }
        Command::Feedback {
            conversation_id,
            value,
        } => {
            let feedback = Feedback::try_from(value)?;
            let services = connect(&config.database).await?;
            services
                .history
                .save_feedback(&conversation_id, feedback)
                .await?;
            println!("Feedback {} registered", feedback.value());
        }
        Command::Models => {
            let llm = LlmRegistry::from_config(&config.llm)?;
            println!("Language models:");
            for id in llm.model_ids() {
                println!("  {}", id);
            }
            println!("Embedding spaces:");
            let startup = cli
                .embedding
                .as_deref()
                .or_else(|| config.embeddings.startup_model());
            for name in config.embeddings.model_names() {
                let marker = if Some(name.as_str()) == startup { "*" } else { " " };
                println!(" {} {}", marker, name);
            }
        }
        Command::UseEmbedding { name } => {
            let expander = sqlgen_discovery::SynonymExpander::disabled(config.embeddings.models.clone());
            expander.set_model(&name).await?;
            let space = expander
                .space()
                .context("Embedding space did not load")?;
            println!(
                "{}: {} words, {} dimensions",
                space.name(),
                space.len(),
                space.dimension()
            );
        }
    }

    Ok(())
}

async fn build_discovery(
    config: &SqlGenConfig,
    services: &DatabaseServices,
    embedding: Option<&str>,
) -> Result<DiscoveryOrchestrator> {
    let mut config = config.clone();
    if let Some(name) = embedding {
        if config.embeddings.model(name).is_none() {
            bail!(
                "Embedding model '{}' not found in available models: {:?}",
                name,
                config.embeddings.model_names()
            );
        }
        config.embeddings.default_model = Some(name.to_string());
    }
    Ok(DiscoveryOrchestrator::from_config(&config, services).await?)
}

fn print_match(result: &MatchResult) {
    println!("Keywords: {}", result.keywords.join(", "));
    if result.is_empty() {
        println!("No tables found");
        return;
    }
    for table in &result.tables {
        let columns: Vec<&str> = table.column_names().collect();
        println!("{} ({})", table.qualified_name(), columns.join(", "));
    }
}

fn print_rows(rows: &QueryRows) {
    println!("{}", rows.columns.join("\t"));
    for row in &rows.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => "NULL".to_string(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
    println!("({} rows)", rows.row_count());
}
