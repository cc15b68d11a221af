/// Failures surfaced by the registry, ledger and grading operations.
///
/// Each variant maps onto one wire error code (see `code`). Badge catalog misses never show up
/// here: awarding a badge that is not in the catalog is a no-op.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "not_found",
            EngineError::Conflict(_) => "conflict",
            EngineError::Validation(_) => "bad_params",
            EngineError::Db(_) => "db_query_failed",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
