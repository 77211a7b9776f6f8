use thiserror::Error;

use convene_store::StoreError;

/// Errors returned by engine operations.
///
/// Every variant is recoverable; the HTTP layer turns each one into a
/// structured failure response.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced user, event, conversation or review does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The actor may not perform the operation.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Malformed input.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The operation collides with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure in the store.
    #[error("Storage error: {0}")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => CoreError::NotFound("record"),
            StoreError::Conflict(msg) => CoreError::Conflict(msg),
            other => CoreError::Storage(other),
        }
    }
}

/// Name the missing entity when a store lookup comes back empty.
pub(crate) trait OrNotFound<T> {
    fn or_not_found(self, what: &'static str) -> Result<T>;
}

impl<T> OrNotFound<T> for convene_store::Result<T> {
    fn or_not_found(self, what: &'static str) -> Result<T> {
        self.map_err(|err| match err {
            StoreError::NotFound => CoreError::NotFound(what),
            other => other.into(),
        })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_meaning() {
        assert!(matches!(
            CoreError::from(StoreError::NotFound),
            CoreError::NotFound(_)
        ));
        assert!(matches!(
            CoreError::from(StoreError::Conflict("dup".into())),
            CoreError::Conflict(_)
        ));
        assert!(matches!(
            CoreError::from(StoreError::NoDataDir),
            CoreError::Storage(_)
        ));
    }

    #[test]
    fn missing_entity_is_named() {
        let res: convene_store::Result<()> = Err(StoreError::NotFound);
        let err = res.or_not_found("event").unwrap_err();
        assert_eq!(err.to_string(), "event not found");
    }
}
