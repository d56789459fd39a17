use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Deck error: {0}")]
    Deck(#[from] DeckError),

    #[error("AnkiConnect error: {0}")]
    Anki(#[from] AnkiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to build client: {0}")]
    BuildError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Response error {status_code} for {url}")]
    ResponseError { status_code: u16, url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Page structure mismatch: no match for required field '{field}'")]
    StructureMismatch { field: &'static str },

    #[error("Expected an integer ordinal, got {value:?}")]
    InvalidNumber { value: String },
}

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Duplicate note key: {key}")]
    DuplicateKey { key: String },

    #[error("Model not found in collection: {0}")]
    MissingModel(String),

    #[error("Deck not found in collection: {0}")]
    MissingDeck(String),
}

#[derive(Error, Debug)]
pub enum AnkiError {
    #[error("Action '{action}' failed: {message}")]
    Api { action: String, message: String },

    #[error("Action '{action}' returned no result")]
    MissingResult { action: String },
}

pub type Result<T> = std::result::Result<T, AppError>;
