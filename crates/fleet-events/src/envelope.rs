//! Envelope encoding/decoding and deterministic event ids.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::payload::{EventBody, RunIdentity};

/// Deterministic event id: Sha256 hex of `run_id:event_type:entity:sim_time_s`.
pub fn event_id(run_id: &str, event_type: &str, entity: &str, sim_time_s: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{run_id}:{event_type}:{entity}:{sim_time_s}").as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// A complete bus message: header plus one typed body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event_id: String,
    #[serde(flatten)]
    pub identity: RunIdentity,
    pub sim_time_s: u64,
    pub ts_utc: String,
    #[serde(flatten)]
    pub body: EventBody,
}

impl Envelope {
    /// Build an envelope, deriving `event_id` from the body's entity label.
    pub fn new(identity: RunIdentity, sim_time_s: u64, ts_utc: String, body: EventBody) -> Self {
        let event_id = event_id(
            &identity.run_id,
            body.routing_key(),
            &body.entity(),
            sim_time_s,
        );
        Self { event_id, identity, sim_time_s, ts_utc, body }
    }

    /// The routing key this envelope is published under.
    #[inline]
    pub fn routing_key(&self) -> &'static str {
        self.body.routing_key()
    }

    /// Compact JSON bytes for the bus.
    pub fn encode(&self) -> EventResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a bus message.  Failures are the caller's cue to log-and-drop;
    /// malformed payloads are never requeued.
    pub fn decode(bytes: &[u8]) -> EventResult<Envelope> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EventResult<T> = Result<T, EventError>;
