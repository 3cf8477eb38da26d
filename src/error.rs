//! Error taxonomy shared across domain, application, and infra layers.
//!
//! Every error in this crate is one of five kinds (see spec §7). The kind is
//! what the interface layer classifies on; the message and source chain are
//! for humans and logs.

use thiserror::Error;

/// Stable classification tag for interface-layer translation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Validation,
    InvariantViolation,
    NotFound,
    Conflict,
    Infrastructure,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input or a domain precondition not satisfied.
    #[error("{message}")]
    Validation {
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A domain state transition was rejected.
    #[error("{message}")]
    InvariantViolation { message: String },

    /// A tenant-scoped lookup missed.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A uniqueness violation surfaced by the data layer.
    #[error("{message}")]
    Conflict { message: String },

    /// Repository or transaction failure.
    #[error("{context}: {cause}")]
    Infrastructure {
        context: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            cause: None,
        }
    }

    pub fn validation_with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Validation {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        AppError::InvariantViolation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str) -> Self {
        AppError::NotFound { entity }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict {
            message: message.into(),
        }
    }

    pub fn infrastructure(
        context: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Infrastructure {
            context: context.into(),
            cause: Box::new(cause),
        }
    }

    /// Wrap this error with a short context prefix, preserving the kind.
    ///
    /// Use-cases call this when propagating a repository error upward so the
    /// original cause stays retrievable via `source()`.
    pub fn context(self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        match self {
            AppError::Validation { message, cause } => AppError::Validation {
                message: format!("{prefix}: {message}"),
                cause,
            },
            AppError::InvariantViolation { message } => AppError::InvariantViolation {
                message: format!("{prefix}: {message}"),
            },
            AppError::Conflict { message } => AppError::Conflict {
                message: format!("{prefix}: {message}"),
            },
            AppError::Infrastructure { context, cause } => AppError::Infrastructure {
                context: format!("{prefix}: {context}"),
                cause,
            },
            other @ AppError::NotFound { .. } => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::InvariantViolation { .. } => ErrorKind::InvariantViolation,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::Conflict { .. } => ErrorKind::Conflict,
            AppError::Infrastructure { .. } => ErrorKind::Infrastructure,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Sentinel errors for named domain invariants (spec §4.1, §4.5, §4.6).
pub mod sentinel {
    use super::AppError;

    pub fn already_closed() -> AppError {
        AppError::invariant("すでに終了しています")
    }

    pub fn collection_closed() -> AppError {
        AppError::invariant("この募集は終了しています")
    }

    pub fn deadline_passed() -> AppError {
        AppError::invariant("回答期限を過ぎています")
    }

    pub fn illegal_tenant_transition(from: &str, to: &str) -> AppError {
        AppError::invariant(format!(
            "テナントの状態を {from} から {to} に変更することはできません"
        ))
    }
}
