//! Configuration management for sqlgen
//!
//! Loads configuration with priority:
//! 1. Explicit config file, or config.toml found in the current directory or a parent
//! 2. Environment variables (fallback when no file exists)
//! 3. Defaults
//!
//! String values may reference environment variables with `${VAR_NAME}`; they are
//! resolved right after parsing and an unset variable is a configuration error.

use crate::providers::ProviderKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// sqlgen configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlGenConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub keywords: KeywordConfig,

    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    #[serde(alias = "postgres")]
    Postgresql,
    Sqlite,
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseEngine::Postgresql => write!(f, "postgresql"),
            DatabaseEngine::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for DatabaseEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DatabaseEngine::Postgresql),
            "sqlite" => Ok(DatabaseEngine::Sqlite),
            other => Err(Error::config_error(format!(
                "Unsupported database type: {}. Supported types are: postgresql, sqlite",
                other
            ))),
        }
    }
}

/// Source database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_engine")]
    pub engine: DatabaseEngine,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    pub user: Option<String>,

    pub password: Option<String>,

    /// Database holding the persisted indexes, conversations and feedback
    #[serde(default = "default_control_database")]
    pub control_database: String,

    /// Catalog connections run read-only sessions
    #[serde(default = "default_true")]
    pub read_only: bool,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Databases never offered for discovery
    #[serde(default = "default_excluded_databases")]
    pub excluded_databases: Vec<String>,

    /// Schemas skipped during introspection
    #[serde(default = "default_system_schemas")]
    pub system_schemas: Vec<String>,

    /// SQLite only: database name -> sqlite URL
    #[serde(default)]
    pub sqlite_databases: BTreeMap<String, String>,

    /// SQLite only: URL of the control database
    pub sqlite_control: Option<String>,
}

/// Table discovery defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Exclusive lower bound on the partial-ratio score (0-100)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: u8,

    #[serde(default = "default_max_synonyms")]
    pub max_synonyms: usize,
}

/// Keyword extraction configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Extra part-of-speech lexicon, one `word<TAB>TAG` per line
    pub lexicon_path: Option<PathBuf>,
}

/// Word-embedding spaces available for synonym expansion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Space loaded at startup; the first configured model when unset
    pub default_model: Option<String>,

    #[serde(default = "default_embedding_models")]
    pub models: Vec<EmbeddingModelConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingModelConfig {
    pub name: String,
    /// GloVe / word2vec text file
    pub path: PathBuf,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,

    #[serde(default = "default_template")]
    pub default_template: String,

    #[serde(default)]
    pub providers: Vec<LlmProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Display name, used as the prefix of model ids
    pub name: String,

    pub kind: ProviderKind,

    pub api_key: Option<String>,

    pub base_url: Option<String>,

    #[serde(default)]
    pub models: Vec<LlmModelConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmModelConfig {
    pub name: String,

    #[serde(default)]
    pub prompt_token_cost_per_1000: f64,

    #[serde(default)]
    pub output_token_cost_per_1000: f64,
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracer name reported on exported spans
    pub service_name: Option<String>,

    /// Emit log lines as JSON instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            host: default_db_host(),
            port: default_db_port(),
            user: None,
            password: None,
            control_database: default_control_database(),
            read_only: true,
            max_connections: default_max_connections(),
            timeout_secs: default_timeout_secs(),
            excluded_databases: default_excluded_databases(),
            system_schemas: default_system_schemas(),
            sqlite_databases: BTreeMap::new(),
            sqlite_control: None,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            max_synonyms: default_max_synonyms(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            default_model: None,
            models: default_embedding_models(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            default_template: default_template(),
            providers: Vec::new(),
        }
    }
}

impl DatabaseConfig {
    /// Check the parameters the configured engine needs
    pub fn validate(&self) -> Result<()> {
        match self.engine {
            DatabaseEngine::Postgresql => {
                if self.host.trim().is_empty() {
                    return Err(Error::config_error("database.host is required for postgresql"));
                }
                if self.user.as_deref().map_or(true, |u| u.trim().is_empty()) {
                    return Err(Error::config_error("database.user is required for postgresql"));
                }
            }
            DatabaseEngine::Sqlite => {
                if self.sqlite_databases.is_empty() {
                    return Err(Error::config_error(
                        "database.sqlite_databases must list at least one database for sqlite",
                    ));
                }
            }
        }
        Ok(())
    }

    /// True when the database is offered for discovery
    pub fn is_searchable(&self, database: &str) -> bool {
        !self.excluded_databases.iter().any(|d| d == database)
    }
}

impl EmbeddingConfig {
    /// Name of the space to load at startup
    pub fn startup_model(&self) -> Option<&str> {
        self.default_model
            .as_deref()
            .or_else(|| self.models.first().map(|m| m.name.as_str()))
    }

    pub fn model(&self, name: &str) -> Option<&EmbeddingModelConfig> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name.clone()).collect()
    }
}

impl SqlGenConfig {
    /// Load configuration from config.toml, searching the current directory and parents
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::find_config_file()?.ok_or_else(|| {
                Error::config_error(
                    "config.toml not found. Create one with: cp config.toml.example config.toml",
                )
            })?,
        };

        tracing::debug!("Loading configuration from: {:?}", config_path);

        let contents = fs::read_to_string(&config_path).map_err(|e| {
            Error::config_error(format!("Failed to read config file {:?}: {}", config_path, e))
        })?;

        Self::from_toml_str(&contents).map_err(|e| match e {
            Error::Config(msg) => {
                Error::config_error(format!("{} (in {:?})", msg, config_path))
            }
            other => other,
        })
    }

    /// Load a config file when one exists, otherwise build one from the environment
    pub fn load_or_env(path: Option<&Path>) -> Result<Self> {
        if path.is_some() {
            return Self::load_from(path);
        }
        match Self::find_config_file()? {
            Some(found) => Self::load_from(Some(&found)),
            None => {
                tracing::debug!("No config.toml found, reading configuration from environment");
                Self::from_env()
            }
        }
    }

    /// Parse a TOML document and resolve `${VAR}` references
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: SqlGenConfig = toml::from_str(contents)
            .map_err(|e| Error::config_error(format!("Failed to parse config: {}", e)))?;
        config.resolve_env_vars()?;
        Ok(config)
    }

    /// Build a configuration from the POSTGRES_* and OPENAI_API_KEY variables
    pub fn from_env() -> Result<Self> {
        let mut config = SqlGenConfig::default();

        if let Ok(host) = env::var("POSTGRES_HOST") {
            config.database.host = host;
        }
        if let Ok(port) = env::var("POSTGRES_PORT") {
            config.database.port = port.trim().parse().map_err(|_| {
                Error::config_error(format!("POSTGRES_PORT is not a valid port: {}", port))
            })?;
        }
        config.database.user = env::var("POSTGRES_USER").ok();
        config.database.password = env::var("POSTGRES_PASSWORD").ok();
        if let Ok(db) = env::var("POSTGRES_DB") {
            config.database.control_database = db;
        }

        if let Ok(api_key) = env::var("OPENAI_API_KEY") {
            config.llm.providers.push(LlmProviderConfig {
                name: "OpenAI".to_string(),
                kind: ProviderKind::OpenAI,
                api_key: Some(api_key),
                base_url: env::var("OPENAI_BASE_URL").ok(),
                models: vec![
                    LlmModelConfig {
                        name: "gpt-4o-mini".to_string(),
                        prompt_token_cost_per_1000: 0.00015,
                        output_token_cost_per_1000: 0.0006,
                    },
                    LlmModelConfig {
                        name: "gpt-4o".to_string(),
                        prompt_token_cost_per_1000: 0.0025,
                        output_token_cost_per_1000: 0.01,
                    },
                ],
            });
        }

        Ok(config)
    }

    /// Find config.toml by searching current directory and parents
    fn find_config_file() -> Result<Option<PathBuf>> {
        let mut current = env::current_dir()?;

        loop {
            let config_path = current.join("config.toml");
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if !current.pop() {
                return Ok(None);
            }
        }
    }

    /// Resolve ${VAR_NAME} references in every string setting
    fn resolve_env_vars(&mut self) -> Result<()> {
        let db = &mut self.database;
        db.host = resolve_env_placeholders(&db.host)?;
        db.control_database = resolve_env_placeholders(&db.control_database)?;
        resolve_optional(&mut db.user)?;
        resolve_optional(&mut db.password)?;
        resolve_optional(&mut db.sqlite_control)?;
        for url in db.sqlite_databases.values_mut() {
            *url = resolve_env_placeholders(url)?;
        }

        for model in &mut self.embeddings.models {
            let raw = model.path.to_string_lossy().into_owned();
            model.path = PathBuf::from(resolve_env_placeholders(&raw)?);
        }

        if let Some(ref path) = self.keywords.lexicon_path {
            let raw = path.to_string_lossy().into_owned();
            self.keywords.lexicon_path = Some(PathBuf::from(resolve_env_placeholders(&raw)?));
        }

        for provider in &mut self.llm.providers {
            resolve_optional(&mut provider.api_key)?;
            resolve_optional(&mut provider.base_url)?;
        }

        resolve_optional(&mut self.observability.service_name)?;

        Ok(())
    }

    /// Create test-friendly defaults (no files or secrets required)
    pub fn test_defaults() -> Self {
        let mut sqlite_databases = BTreeMap::new();
        sqlite_databases.insert("test".to_string(), "sqlite::memory:".to_string());

        Self {
            database: DatabaseConfig {
                engine: DatabaseEngine::Sqlite,
                sqlite_databases,
                ..DatabaseConfig::default()
            },
            discovery: DiscoveryConfig::default(),
            keywords: KeywordConfig::default(),
            embeddings: EmbeddingConfig {
                default_model: None,
                models: Vec::new(),
            },
            llm: LlmConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Replace every `${VAR}` in `value` with the variable's value
pub fn resolve_env_placeholders(value: &str) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            Error::config_error(format!("Unterminated environment reference in '{}'", value))
        })?;
        let var_name = &after[..end];
        let resolved = env::var(var_name).map_err(|_| {
            Error::config_error(format!("Environment variable {} is not set", var_name))
        })?;
        out.push_str(&resolved);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn resolve_optional(value: &mut Option<String>) -> Result<()> {
    if let Some(v) = value.as_deref() {
        *value = Some(resolve_env_placeholders(v)?);
    }
    Ok(())
}

fn default_engine() -> DatabaseEngine {
    DatabaseEngine::Postgresql
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_control_database() -> String {
    "sql_generator".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_excluded_databases() -> Vec<String> {
    vec![
        "postgres".to_string(),
        "dagster".to_string(),
        "sql_generator".to_string(),
    ]
}

fn default_system_schemas() -> Vec<String> {
    vec!["information_schema".to_string(), "pg_catalog".to_string()]
}

fn default_similarity_threshold() -> u8 {
    90
}

fn default_max_synonyms() -> usize {
    5
}

fn default_embedding_models() -> Vec<EmbeddingModelConfig> {
    [50, 100, 200, 300]
        .iter()
        .map(|dim| EmbeddingModelConfig {
            name: format!("glove-wiki-gigaword-{}", dim),
            path: PathBuf::from(format!("models/glove-wiki-gigaword-{}.txt", dim)),
        })
        .collect()
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_template() -> String {
    "basic_prompt".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SqlGenConfig::default();
        assert_eq!(config.database.engine, DatabaseEngine::Postgresql);
        assert_eq!(config.database.control_database, "sql_generator");
        assert!(config.database.read_only);
        assert_eq!(config.discovery.similarity_threshold, 90);
        assert_eq!(config.discovery.max_synonyms, 5);
        assert_eq!(
            config.embeddings.startup_model(),
            Some("glove-wiki-gigaword-50")
        );
        assert_eq!(config.embeddings.models.len(), 4);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [database]
            engine = "postgres"
            host = "db"
            user = "reader"
            excluded_databases = ["postgres"]

            [discovery]
            similarity_threshold = 80
            max_synonyms = 3

            [embeddings]
            default_model = "tiny"
            [[embeddings.models]]
            name = "tiny"
            path = "models/tiny.txt"

            [[llm.providers]]
            name = "OpenAI"
            kind = "openai"
            api_key = "sk-test"
            [[llm.providers.models]]
            name = "gpt-4o-mini"
            prompt_token_cost_per_1000 = 0.00015
            output_token_cost_per_1000 = 0.0006
        "#;

        let config = SqlGenConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.database.engine, DatabaseEngine::Postgresql);
        assert_eq!(config.database.host, "db");
        assert_eq!(config.database.port, 5432);
        assert!(config.database.validate().is_ok());
        assert!(config.database.is_searchable("sakila"));
        assert!(!config.database.is_searchable("postgres"));
        assert_eq!(config.discovery.similarity_threshold, 80);
        assert_eq!(config.embeddings.startup_model(), Some("tiny"));
        assert_eq!(config.llm.providers.len(), 1);
        assert_eq!(config.llm.providers[0].kind, ProviderKind::OpenAI);
        assert_eq!(config.llm.providers[0].models[0].name, "gpt-4o-mini");
    }

    #[test]
    fn test_unknown_engine_is_config_error() {
        let result = SqlGenConfig::from_toml_str("[database]\nengine = \"oracle\"\n");
        assert!(matches!(result, Err(Error::Config(_))));

        let parsed: Result<DatabaseEngine> = "mysql".parse();
        assert!(matches!(parsed, Err(Error::Config(_))));
        assert_eq!("PostgreSQL".parse::<DatabaseEngine>().unwrap(), DatabaseEngine::Postgresql);
    }

    #[test]
    fn test_unknown_provider_kind_is_config_error() {
        let toml = r#"
            [[llm.providers]]
            name = "Mystery"
            kind = "mystery"
        "#;
        assert!(matches!(
            SqlGenConfig::from_toml_str(toml),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_postgres_user_fails_validation() {
        let config = DatabaseConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_sqlite_requires_databases() {
        let config = DatabaseConfig {
            engine: DatabaseEngine::Sqlite,
            ..DatabaseConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(SqlGenConfig::test_defaults().database.validate().is_ok());
    }

    #[test]
    fn test_resolve_env_placeholders() {
        unsafe {
            env::set_var("SQLGEN_TEST_HOST", "db.internal");
        }

        let resolved = resolve_env_placeholders("${SQLGEN_TEST_HOST}:5432").unwrap();
        assert_eq!(resolved, "db.internal:5432");

        let plain = resolve_env_placeholders("plain_value").unwrap();
        assert_eq!(plain, "plain_value");

        let missing = resolve_env_placeholders("${SQLGEN_TEST_SURELY_UNSET}");
        assert!(matches!(missing, Err(Error::Config(_))));

        let unterminated = resolve_env_placeholders("${SQLGEN_TEST_HOST");
        assert!(unterminated.is_err());

        unsafe {
            env::remove_var("SQLGEN_TEST_HOST");
        }
    }

    #[test]
    fn test_placeholders_resolved_on_parse() {
        unsafe {
            env::set_var("SQLGEN_TEST_PASSWORD", "s3cret");
        }

        let config =
            SqlGenConfig::from_toml_str("[database]\nuser = \"u\"\npassword = \"${SQLGEN_TEST_PASSWORD}\"\n")
                .unwrap();
        assert_eq!(config.database.password.as_deref(), Some("s3cret"));

        unsafe {
            env::remove_var("SQLGEN_TEST_PASSWORD");
        }
    }
}
