use serde::{Deserialize, Serialize};

use crate::error::ErrorInfo;

/// A typed event decoded from the inbound stream.
///
/// The wire framing is newline-delimited `data: <json>` lines; payloads are
/// an internally tagged union. Unknown event types deserialize to `Unknown`
/// so newer backends don't break older clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    MessageStart {
        id: String,
    },
    ContentDelta {
        text: String,
    },
    MessageStop {
        id: String,
    },
    Error {
        error: ErrorInfo,
    },
    Ping,
    #[serde(other)]
    Unknown,
}

impl WireEvent {
    /// Keep-alives and unrecognized event types carry nothing to dispatch.
    pub fn is_noise(&self) -> bool {
        matches!(self, WireEvent::Ping | WireEvent::Unknown)
    }
}

/// Decode one raw line into an event.
///
/// Returns `None` for everything that isn't a recognizable `data:` payload:
/// blank lines, SSE comments, non-data fields, `[DONE]`, and payloads that
/// fail to parse. Forward-compatibility takes precedence over strictness.
pub fn parse_line(line: &str) -> Option<WireEvent> {
    let line = line.trim_end_matches(['\n', '\r']);

    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    let rest = line.strip_prefix("data:")?;
    let data = rest.trim_start();

    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<WireEvent>(data) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::debug!(%err, line = data, "ignoring unparseable stream line");
            None
        }
    }
}
