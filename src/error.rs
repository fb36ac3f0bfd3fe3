use thiserror::Error;

/// Errors raised while assembling or executing table commands
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("cannot build placeholders for {rows} rows of {columns} columns")]
    EmptyPlaceholders { columns: usize, rows: usize },

    #[error("binding out of order: expected index {expected}, got {actual}")]
    BindingOutOfOrder { expected: usize, actual: usize },

    #[error("bound {bound} parameters but statement expects {expected}")]
    ShapeMismatch { bound: usize, expected: usize },

    #[error("cannot migrate backwards from version {from} to {to}")]
    BackwardsMigration { from: u32, to: u32 },

    #[error("additive migration must not drop the table")]
    DestructiveAdditiveMigration,

    #[error("execution client is closed")]
    ClientClosed,

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
