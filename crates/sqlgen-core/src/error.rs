use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema introspection failed for database '{database}': {source}")]
    Introspection {
        database: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Query failed on database '{database}': {message}")]
    Query { database: String, message: String },

    #[error("LLM request failed: {0}")]
    LLMError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating configuration errors
    ///
    /// # Example
    /// ```
    /// use sqlgen_core::Error;
    /// let err = Error::config_error("Unsupported database type: oracle");
    /// ```
    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Helper for wrapping a catalog failure for one database
    pub fn introspection(database: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Error::Introspection {
            database: database.into(),
            source: source.into(),
        }
    }

    /// Helper for creating blob store errors
    pub fn persistence(msg: impl Into<String>) -> Self {
        Error::Persistence(msg.into())
    }

    /// Helper for tagger / embedding model load errors
    pub fn model(msg: impl Into<String>) -> Self {
        Error::Model(msg.into())
    }

    /// Helper for creating general errors with a message
    ///
    /// # Example
    /// ```
    /// use sqlgen_core::Error;
    /// let err = Error::message("Something went wrong");
    /// ```
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Other(anyhow::anyhow!("{}", msg.into()))
    }

    /// True for failures that mean "the search could not run" as opposed to
    /// configuration mistakes caught at startup.
    pub fn is_introspection(&self) -> bool {
        matches!(self, Error::Introspection { .. })
    }
}
