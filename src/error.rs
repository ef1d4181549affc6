use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotInitialized,
    TemplateNotFound,
    ProjectNotFound,
    TaskNotFound,
    ObjectionNotFound,
    UserNotFound,
    AmbiguousRef,
    ValidationError,
    IllegalState,
    NotAuthorized,
    ConcurrencyConflict,
    DuplicateId,
    DatabaseError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::TemplateNotFound => "TEMPLATE_NOT_FOUND",
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::TaskNotFound => "TASK_NOT_FOUND",
            Self::ObjectionNotFound => "OBJECTION_NOT_FOUND",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::AmbiguousRef => "AMBIGUOUS_REF",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::IllegalState => "ILLEGAL_STATE",
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::DuplicateId => "DUPLICATE_ID",
            Self::DatabaseError => "DATABASE_ERROR",
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConcurrencyConflict => 3,
            _ => 1,
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct FmsError {
    pub code: ErrorCode,
    pub message: String,
}

impl FmsError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_initialized() -> Self {
        Self::new(
            ErrorCode::NotInitialized,
            "fms is not initialized. Run `fms init` first.",
        )
    }

    pub fn template_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::TemplateNotFound,
            format!("Template not found: {reference}"),
        )
    }

    pub fn project_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::ProjectNotFound,
            format!("Project not found: {reference}"),
        )
    }

    pub fn task_not_found(project: &str, seq: u32) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task {seq} not found in project {project}"),
        )
    }

    pub fn objection_not_found(seq: u32, reference: &str) -> Self {
        Self::new(
            ErrorCode::ObjectionNotFound,
            format!("Objection {reference} not found on task {seq}"),
        )
    }

    pub fn user_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::UserNotFound,
            format!("User not found: {reference}"),
        )
    }

    pub fn ambiguous_ref(reference: &str, candidates: &[String]) -> Self {
        Self::new(
            ErrorCode::AmbiguousRef,
            format!(
                "Ambiguous reference '{}'. Candidates: {}",
                reference,
                candidates.join(", ")
            ),
        )
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IllegalState, message)
    }

    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotAuthorized, message)
    }

    pub fn concurrency_conflict(project: &str, version: i64) -> Self {
        Self::new(
            ErrorCode::ConcurrencyConflict,
            format!("Project {project} changed since version {version} was loaded; reload and retry"),
        )
    }

    pub fn duplicate_id(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DuplicateId, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code == ErrorCode::DuplicateId
    }
}

impl From<rusqlite::Error> for FmsError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Self::duplicate_id(e.to_string())
            }
            _ => Self::database(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for FmsError {
    fn from(e: serde_json::Error) -> Self {
        Self::database(format!("Corrupt stored document: {e}"))
    }
}
