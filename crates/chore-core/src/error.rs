use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ambiguous short ID. Did you mean one of these?")]
    AmbiguousId(Vec<(String, String)>), // Vec of (ID, Name)

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// A stored recurrence rule could not be decoded. Callers that advance
    /// recurrences treat this as "no rule" after logging it.
    #[error("Corrupt recurrence rule: {0}")]
    CorruptRule(String),

    #[error("Push delivery error: {0}")]
    Delivery(String),
}
