use teloxide::RequestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GastoBotError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] RequestError),

    #[error("Parser error: {message}")]
    Parser { message: String },

    #[error("Invalid budget limit: {input}")]
    InvalidLimit { input: String },

    #[error("Expense not found: {id}")]
    ExpenseNotFound { id: i64 },

    #[error("Store operation timed out: {operation}")]
    StoreTimeout { operation: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, GastoBotError>;

impl GastoBotError {
    pub fn parser_error(message: impl Into<String>) -> Self {
        Self::Parser {
            message: message.into(),
        }
    }

    pub fn invalid_limit(input: impl Into<String>) -> Self {
        Self::InvalidLimit {
            input: input.into(),
        }
    }

    pub fn expense_not_found(id: i64) -> Self {
        Self::ExpenseNotFound { id }
    }

    pub fn store_timeout(operation: impl Into<String>) -> Self {
        Self::StoreTimeout {
            operation: operation.into(),
        }
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GastoBotError::Database(_)
                | GastoBotError::Telegram(_)
                | GastoBotError::Io(_)
                | GastoBotError::StoreTimeout { .. }
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GastoBotError::Config(_) => ErrorSeverity::Critical,
            GastoBotError::Database(_) => ErrorSeverity::High,
            GastoBotError::Telegram(_) => ErrorSeverity::Medium,
            GastoBotError::Parser { .. } => ErrorSeverity::Low,
            GastoBotError::InvalidLimit { .. } => ErrorSeverity::Low,
            GastoBotError::ExpenseNotFound { .. } => ErrorSeverity::Medium,
            GastoBotError::StoreTimeout { .. } => ErrorSeverity::Medium,
            GastoBotError::Io(_) => ErrorSeverity::Medium,
            GastoBotError::Env(_) => ErrorSeverity::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
