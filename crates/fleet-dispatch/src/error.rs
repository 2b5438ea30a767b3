use fleet_events::EventError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("event encoding failed: {0}")]
    Event(#[from] EventError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
