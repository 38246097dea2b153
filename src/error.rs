use thiserror::Error;

/// Failure kinds surfaced by the directory and recipe-source collaborators.
///
/// None of these are fatal to the engine: every caller degrades to an
/// empty or partial result and logs the error.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Directory or recipe source unreachable, timed out, or returned garbage.
    #[error("{source_name} unavailable: {reason}")]
    Connectivity {
        source_name: &'static str,
        reason: String,
    },

    #[error("{0} not found")]
    NotFound(String),

    /// A single record is malformed (bad coordinate, missing field).
    #[error("invalid record: {0}")]
    Validation(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl MatchError {
    pub fn directory(reason: impl ToString) -> Self {
        Self::Connectivity {
            source_name: "directory",
            reason: reason.to_string(),
        }
    }

    pub fn recipe_source(reason: impl ToString) -> Self {
        Self::Connectivity {
            source_name: "recipe source",
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<sqlx::Error> for MatchError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row".into()),
            other => Self::directory(other),
        }
    }
}

impl From<reqwest::Error> for MatchError {
    fn from(e: reqwest::Error) -> Self {
        Self::recipe_source(e)
    }
}
