use wikifeat_core::error::CoreError;
use wikifeat_db::StoreError;

/// Error type for content engine operations.
///
/// Wraps [`CoreError`] for domain errors (validation, not found, conflict)
/// and [`StoreError`] for backend failures the engine cannot classify.
#[derive(Debug, thiserror::Error)]
pub enum WikiError {
    /// A domain-level error from `wikifeat_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A transport or backend failure from the document store.
    #[error(transparent)]
    Store(StoreError),
}

/// Convenience type alias for engine return values.
pub type WikiResult<T> = Result<T, WikiError>;

impl From<StoreError> for WikiError {
    /// Stale revisions surface as domain conflicts; everything else keeps
    /// its store error so the cause is preserved.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => WikiError::Core(CoreError::Conflict(msg)),
            other => WikiError::Store(other),
        }
    }
}

impl From<serde_json::Error> for WikiError {
    fn from(err: serde_json::Error) -> Self {
        WikiError::Store(StoreError::Serialization(err))
    }
}

impl WikiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        WikiError::Core(CoreError::Validation(msg.into()))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        WikiError::Core(CoreError::Conflict(msg.into()))
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        WikiError::Core(CoreError::NotFound {
            entity,
            id: id.into(),
        })
    }

    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            WikiError::Core(CoreError::Validation(_)) => 400,
            WikiError::Core(CoreError::NotFound { .. }) => 404,
            WikiError::Core(CoreError::Conflict(_)) => 409,
            WikiError::Core(CoreError::Internal(_)) => 500,
            WikiError::Store(StoreError::NotFound(_)) => 404,
            WikiError::Store(StoreError::Conflict(_)) => 409,
            WikiError::Store(_) => 500,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self.status_code() {
            400 => "VALIDATION_ERROR",
            404 => "NOT_FOUND",
            409 => "CONFLICT",
            _ => match self {
                WikiError::Core(_) => "INTERNAL_ERROR",
                WikiError::Store(_) => "STORE_ERROR",
            },
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status_code() == 409
    }
}

/// Turns a store `NotFound` into a domain `NotFound` naming the entity.
pub(crate) trait NotFoundExt<T> {
    fn or_not_found(self, entity: &'static str, id: &str) -> WikiResult<T>;
}

impl<T> NotFoundExt<T> for Result<T, StoreError> {
    fn or_not_found(self, entity: &'static str, id: &str) -> WikiResult<T> {
        self.map_err(|err| match err {
            StoreError::NotFound(_) => WikiError::not_found(entity, id),
            other => other.into(),
        })
    }
}
