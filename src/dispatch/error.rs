/// Errors raised while selecting a dispatch strategy.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown dispatch strategy '{0}' (expected 'fifo' or 'matched')")]
    UnknownStrategy(String),
}
