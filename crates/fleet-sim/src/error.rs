use fleet_events::EventError;
use fleet_scenario::ScenarioError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("scenario generation failed: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("event encoding failed: {0}")]
    Event(#[from] EventError),

    #[error("run already active: {0}")]
    RunActive(String),
}

pub type SimResult<T> = Result<T, SimError>;
