use thiserror::Error;

use super::MeasurementResult;

/// Item delivered on a live subscription: a result, or a per-item error.
pub type StreamItem = Result<MeasurementResult, StreamError>;

/// Per-item errors on a live result subscription.
///
/// `Disconnected` is a control-flow signal: the transport is gone and the
/// subscriber has to reconnect. All other parse errors only affect the
/// offending item.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("subscription stream disconnected: {0}")]
    Disconnected(String),

    #[error("failed parsing measurement result: {0}")]
    Parse(String),
}

impl StreamError {
    pub fn is_disconnect(&self) -> bool {
        matches!(self, StreamError::Disconnected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_is_distinguished_from_parse_errors() {
        assert!(StreamError::Disconnected("eof".into()).is_disconnect());
        assert!(!StreamError::Parse("bad json".into()).is_disconnect());
    }
}
