use serde::Deserialize;
use serde_json::Value;

/// The `{code, data, msg}` response envelope used by every endpoint this
/// crawler talks to.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub msg: String,
}

/// Outcome of interpreting an envelope's `code` field.
pub enum EnvelopeOutcome {
    /// `code == 0`: carries the payload.
    Success(Value),
    /// `code == 88214`: a positive signal with no payload (e.g. a disabled
    /// feature reported as present-but-empty, not absent).
    EmptySuccess,
    /// `code == -412`: upstream rate-limiting; caller should ban the proxy
    /// in use and retry.
    RateLimited,
    /// Any other code: a permanent rejection, not retried.
    Rejected { code: i64, msg: String },
}

impl Envelope {
    pub fn interpret(self) -> EnvelopeOutcome {
        match self.code {
            0 => EnvelopeOutcome::Success(self.data),
            88214 => EnvelopeOutcome::EmptySuccess,
            -412 => EnvelopeOutcome::RateLimited,
            code => EnvelopeOutcome::Rejected { code, msg: self.msg },
        }
    }
}
