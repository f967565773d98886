use thiserror::Error;

/// エラー型
#[derive(Error, Debug)]
pub enum ModeError {
    #[error("PIN must be exactly 4 digits")]
    InvalidPin,

    #[error("PIN entry is locked for another {0} seconds")]
    Locked(i64),

    #[error("Current PIN does not match")]
    PinMismatch,

    #[error("Storage error: {0}")]
    StorageError(#[from] orbit_learn_storage::StorageError),
}
